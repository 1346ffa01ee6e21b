// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod clock;
pub mod config;
pub mod error;
pub mod feed;
pub mod import;
pub mod markers;
pub mod metrics;
pub mod normalize;
pub mod query;
pub mod scale;
pub mod source;
pub mod stats;
pub mod store;
pub mod timeparse;
pub mod window;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::normalize::NormalizedDisaster;
pub use crate::source::Source;
pub use crate::window::Range;

/// Build the full router from `DashboardConfig::load_default()`.
/// The `/metrics` route is not included; see [`metrics::Metrics`].
pub fn app() -> anyhow::Result<axum::Router> {
    let cfg = config::DashboardConfig::load_default()?;
    let state = AppState::from_config(&cfg)?;
    Ok(router(state))
}
