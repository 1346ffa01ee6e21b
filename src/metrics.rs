use axum::{routing::get, Router};
use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder. Call once, from the binary.
    pub fn init() -> anyhow::Result<Self> {
        // Use default buckets to avoid API differences across crate versions.
        let handle = PrometheusBuilder::new().install_recorder()?;
        ensure_described();
        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("query_requests_total", "Query pipeline invocations.");
        describe_counter!(
            "query_records_read_total",
            "Raw documents read from the store."
        );
        describe_counter!(
            "query_records_kept_total",
            "Normalized records inside the time window."
        );
        describe_counter!(
            "query_time_anomalies_total",
            "Records whose time could not be parsed."
        );
        describe_counter!(
            "query_number_anomalies_total",
            "Numeric fields coerced to 0."
        );
        describe_counter!("store_errors_total", "Store connection/query failures.");
        describe_counter!("feed_errors_total", "Live feed fetch/parse failures.");
        describe_histogram!("query_duration_ms", "Query pipeline time in milliseconds.");
    });
}
