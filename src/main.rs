//! Disaster Dashboard: binary entrypoint.
//! Boots the Axum HTTP server over the configured document store.

use disaster_dashboard::config::DashboardConfig;
use disaster_dashboard::metrics::Metrics;
use disaster_dashboard::{router, AppState};
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Enable tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - DASHBOARD_DEV_LOG=1
/// DASHBOARD_LOG_JSON=1 switches the compact formatter for JSON lines.
fn enable_dev_tracing() {
    let flag = |name: &str| std::env::var(name).ok().is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(flag("DASHBOARD_DEV_LOG") && is_dev_env) {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("store=info,query=info,feed=info,api=info,warn"));

    // try_init: the shuttle runtime may already have installed a subscriber.
    let res = if flag("DASHBOARD_LOG_JSON") {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .try_init()
    };
    if let Err(e) = res {
        eprintln!("tracing already initialized: {e}");
    }
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    enable_dev_tracing();

    let cfg = DashboardConfig::load_default()?;
    tracing::info!(target: "api", store = ?cfg.store, "dashboard config loaded");

    let state = AppState::from_config(&cfg)?;
    let mut app = router(state);

    match Metrics::init() {
        Ok(m) => app = app.merge(m.router()),
        Err(e) => tracing::warn!(error = ?e, "metrics exporter not installed"),
    }

    Ok(app.into())
}
