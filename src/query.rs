// src/query.rs
//! Query pipeline: Reader → Time Parser → Field Normalizer → Time-Window Filter.

use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use serde::Serialize;

use crate::error::StoreError;
use crate::normalize::{normalize_checked, NormalizedDisaster};
use crate::source::Source;
use crate::store::{read_source, DocumentStore, RawRecord};
use crate::window::{filter_window, lower_bound, Range};

/// Data-quality counters for one query. Never affects the returned data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    pub read: usize,
    pub kept: usize,
    pub time_anomalies: usize,
    pub number_anomalies: usize,
}

impl Diagnostics {
    pub fn anomalies(&self) -> usize {
        self.time_anomalies + self.number_anomalies
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutput {
    pub data: Vec<NormalizedDisaster>,
    pub diagnostics: Diagnostics,
}

/// Normalize and window-filter an already-read batch.
pub fn process(
    raw: &[RawRecord],
    source: Source,
    range: Range,
    now: DateTime<Utc>,
) -> QueryOutput {
    let mut diagnostics = Diagnostics {
        read: raw.len(),
        ..Diagnostics::default()
    };

    let mut normalized = Vec::with_capacity(raw.len());
    for doc in raw {
        let out = normalize_checked(doc, source);
        for a in &out.anomalies {
            if a.is_time() {
                diagnostics.time_anomalies += 1;
            } else {
                diagnostics.number_anomalies += 1;
            }
        }
        normalized.push(out.record);
    }

    let data = filter_window(normalized, lower_bound(now, range));
    diagnostics.kept = data.len();
    QueryOutput { data, diagnostics }
}

/// Read `source` from the store and run the full pipeline against `now`.
pub async fn run_query(
    store: &dyn DocumentStore,
    source: Source,
    range: Range,
    now: DateTime<Utc>,
) -> Result<QueryOutput, StoreError> {
    crate::metrics::ensure_described();
    counter!("query_requests_total").increment(1);
    let t0 = std::time::Instant::now();

    let raw = read_source(store, source).await?;
    let out = process(&raw, source, range, now);

    let d = out.diagnostics;
    counter!("query_records_read_total").increment(d.read as u64);
    counter!("query_records_kept_total").increment(d.kept as u64);
    counter!("query_time_anomalies_total").increment(d.time_anomalies as u64);
    counter!("query_number_anomalies_total").increment(d.number_anomalies as u64);
    histogram!("query_duration_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

    tracing::info!(
        target: "query",
        source = source.as_str(),
        range = range.as_str(),
        read = d.read,
        kept = d.kept,
        anomalies = d.anomalies(),
        "query done"
    );

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn process_counts_anomalies_and_drops_invalid_times() {
        let now = Utc.with_ymd_and_hms(2025, 4, 30, 23, 58, 52).unwrap();
        let raw = vec![
            RawRecord::new()
                .with("_id", "ok")
                .with("magnitude_value", 4.2)
                .with("latitude", 1.0)
                .with("longitude", 2.0)
                .with("time", "2025-04-30 23:30:00"),
            RawRecord::new()
                .with("_id", "no-time")
                .with("magnitude_value", 3.0)
                .with("latitude", 1.0)
                .with("longitude", 2.0),
        ];
        let out = process(&raw, Source::Usgs, Range::Hour, now);
        assert_eq!(out.data.len(), 1);
        assert_eq!(out.data[0].id, "ok");
        assert_eq!(
            out.diagnostics,
            Diagnostics {
                read: 2,
                kept: 1,
                time_anomalies: 1,
                number_anomalies: 0
            }
        );
    }
}
