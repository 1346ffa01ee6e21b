// src/normalize.rs
//! Field normalizer: maps each provider's raw schema onto [`NormalizedDisaster`].
//!
//! | source | magnitude_value            | magnitude_unit                       | type                 |
//! |--------|----------------------------|--------------------------------------|----------------------|
//! | usgs   | numeric field              | field or `"Richter"`                 | `"Earthquake"`       |
//! | eonet  | numeric field or `0`       | field or `""`; `"acres"` for fires   | field, canonicalized |
//! | gdacs  | `magnitude` string parsed  | field or `""`                        | field, canonicalized |
//!
//! Bad fields never abort a record: they are reported as [`ParseAnomaly`]
//! values by [`normalize_checked`] and replaced by sentinels (`0`, invalid time).

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::error::ParseAnomaly;
use crate::source::Source;
use crate::store::{RawRecord, RawValue};
use crate::timeparse::{parse_time, Timestamp};

pub const EARTHQUAKE: &str = "Earthquake";
pub const WILDFIRES: &str = "Wildfires";
const WILDFIRE_RAW: &str = "Wildfire";
const DEFAULT_USGS_UNIT: &str = "Richter";
const WILDFIRE_UNIT: &str = "acres";

/// Leading float literal, the way `parseFloat` reads one.
static FLOAT_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?").expect("float prefix regex")
});

/// Canonical disaster record, identical in shape for every source.
///
/// Serialized field names match what the dashboard UI reads (`_id`,
/// `magnitude_value`, ...). `description` is `null` when the source had none.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedDisaster {
    #[serde(rename = "_id")]
    pub id: String,
    pub magnitude_value: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub place: String,
    pub description: Option<String>,
    pub time: Timestamp,
    pub magnitude_unit: String,
    pub source: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// A normalized record plus every anomaly met while building it.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub record: NormalizedDisaster,
    pub anomalies: Vec<ParseAnomaly>,
}

/// `"Wildfire"` becomes `"Wildfires"`; everything else passes through.
pub fn canonical_type(raw: &str) -> String {
    if raw == WILDFIRE_RAW {
        WILDFIRES.to_string()
    } else {
        raw.to_string()
    }
}

/// Parse the leading float of `s`, ignoring trailing garbage (`"5.5 km"` is 5.5).
pub fn parse_float_prefix(s: &str) -> Option<f64> {
    FLOAT_PREFIX
        .find(s.trim_start())
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|n| n.is_finite())
}

/// Lenient normalization: anomalies are dropped, sentinels kept.
pub fn normalize(raw: &RawRecord, source: Source) -> NormalizedDisaster {
    normalize_checked(raw, source).record
}

pub fn normalize_checked(raw: &RawRecord, source: Source) -> Normalized {
    let mut anomalies = Vec::new();
    let mut or_zero = |r: Result<f64, ParseAnomaly>| match r {
        Ok(n) => n,
        Err(a) => {
            anomalies.push(a);
            0.0
        }
    };

    let (magnitude_value, magnitude_unit, kind) = match source {
        Source::Usgs => (
            or_zero(numeric_field(raw, "magnitude_value")),
            raw.text("magnitude_unit")
                .unwrap_or(DEFAULT_USGS_UNIT)
                .to_string(),
            EARTHQUAKE.to_string(),
        ),
        Source::Eonet => {
            let kind = canonical_type(&text_or_empty(raw, "type"));
            let unit = if kind == WILDFIRES {
                WILDFIRE_UNIT.to_string()
            } else {
                text_or_empty(raw, "magnitude_unit")
            };
            (or_zero(optional_numeric_field(raw, "magnitude_value")), unit, kind)
        }
        Source::Gdacs => (
            or_zero(float_string_field(raw, "magnitude")),
            text_or_empty(raw, "magnitude_unit"),
            canonical_type(&text_or_empty(raw, "type")),
        ),
    };

    let (latitude, longitude) = match source {
        Source::Gdacs => (
            or_zero(float_string_field(raw, "latitude")),
            or_zero(float_string_field(raw, "longitude")),
        ),
        Source::Usgs | Source::Eonet => (
            or_zero(numeric_field(raw, "latitude")),
            or_zero(numeric_field(raw, "longitude")),
        ),
    };

    let time = match parse_time(raw) {
        Ok(dt) => Timestamp::new(dt),
        Err(a) => {
            anomalies.push(a);
            Timestamp::invalid()
        }
    };

    let record = NormalizedDisaster {
        id: raw.id(),
        magnitude_value,
        latitude,
        longitude,
        place: text_or_empty(raw, "place"),
        description: raw
            .value("description")
            .and_then(RawValue::to_display_string),
        time,
        magnitude_unit,
        source: source.tag().to_string(),
        kind,
    };

    if !anomalies.is_empty() {
        tracing::debug!(
            target: "query",
            id = %record.id,
            source = source.as_str(),
            anomalies = anomalies.len(),
            "record normalized with anomalies"
        );
    }

    Normalized { record, anomalies }
}

fn text_or_empty(raw: &RawRecord, field: &str) -> String {
    raw.value(field)
        .and_then(RawValue::to_display_string)
        .unwrap_or_default()
}

/// Already-numeric field. Numeric text is accepted too.
fn numeric_field(raw: &RawRecord, field: &'static str) -> Result<f64, ParseAnomaly> {
    match raw.value(field) {
        None => Err(ParseAnomaly::MissingNumber { field }),
        Some(RawValue::Number(n)) if n.is_finite() => Ok(*n),
        Some(RawValue::Text(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .ok_or(ParseAnomaly::UnparseableNumber { field }),
        Some(_) => Err(ParseAnomaly::UnparseableNumber { field }),
    }
}

/// Numeric field where absence means `0`.
fn optional_numeric_field(raw: &RawRecord, field: &'static str) -> Result<f64, ParseAnomaly> {
    match raw.value(field) {
        None => Ok(0.0),
        Some(_) => numeric_field(raw, field),
    }
}

/// Numeric string field (GDACS ships magnitudes and coordinates as text).
fn float_string_field(raw: &RawRecord, field: &'static str) -> Result<f64, ParseAnomaly> {
    match raw.value(field) {
        None => Err(ParseAnomaly::MissingNumber { field }),
        Some(RawValue::Number(n)) if n.is_finite() => Ok(*n),
        Some(RawValue::Text(s)) => {
            parse_float_prefix(s).ok_or(ParseAnomaly::UnparseableNumber { field })
        }
        Some(_) => Err(ParseAnomaly::UnparseableNumber { field }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_prefix_matches_parse_float() {
        assert_eq!(parse_float_prefix("5.5"), Some(5.5));
        assert_eq!(parse_float_prefix("  -12.25abc"), Some(-12.25));
        assert_eq!(parse_float_prefix(".5"), Some(0.5));
        assert_eq!(parse_float_prefix("1e3m"), Some(1000.0));
        assert_eq!(parse_float_prefix("1e"), Some(1.0));
        assert_eq!(parse_float_prefix("abc"), None);
        assert_eq!(parse_float_prefix(""), None);
    }

    #[test]
    fn wildfire_label_is_pluralized_only() {
        assert_eq!(canonical_type("Wildfire"), "Wildfires");
        assert_eq!(canonical_type("Wildfires"), "Wildfires");
        assert_eq!(canonical_type("wildfire"), "wildfire");
        assert_eq!(canonical_type("Flood"), "Flood");
    }

    #[test]
    fn gdacs_zero_and_garbage_look_the_same_but_only_garbage_is_reported() {
        let zero = RawRecord::new()
            .with("magnitude", "0")
            .with("latitude", "1")
            .with("longitude", "2")
            .with("time", "2025-04-30T00:00:00Z");
        let bad = zero.clone().with("magnitude", "n/a");

        let a = normalize_checked(&zero, Source::Gdacs);
        let b = normalize_checked(&bad, Source::Gdacs);
        assert_eq!(a.record.magnitude_value, 0.0);
        assert_eq!(b.record.magnitude_value, 0.0);
        assert!(a.anomalies.is_empty());
        assert_eq!(
            b.anomalies,
            vec![ParseAnomaly::UnparseableNumber { field: "magnitude" }]
        );
    }

    #[test]
    fn eonet_missing_magnitude_defaults_silently() {
        let rec = RawRecord::new()
            .with("type", "Severe Storms")
            .with("latitude", 10.0)
            .with("longitude", 20.0)
            .with("time", "2025-04-30T00:00:00Z");
        let out = normalize_checked(&rec, Source::Eonet);
        assert_eq!(out.record.magnitude_value, 0.0);
        assert_eq!(out.record.magnitude_unit, "");
        assert!(out.anomalies.is_empty());
    }
}
