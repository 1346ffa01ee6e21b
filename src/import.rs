// src/import.rs
//! Manual JSON file import: an array of arbitrary objects mapped onto
//! [`NormalizedDisaster`] with looser defaults than the per-source normalizer.

use serde_json::Value;

use crate::error::ImportError;
use crate::normalize::NormalizedDisaster;
use crate::scale::ScaleTable;
use crate::store::{RawRecord, RawValue};
use crate::timeparse::{parse_instant, Timestamp};

const DEFAULT_SOURCE: &str = "JSON";
const DEFAULT_TYPE: &str = "Unknown";

pub fn import_json(text: &str, scales: &ScaleTable) -> Result<Vec<NormalizedDisaster>, ImportError> {
    let value: Value = serde_json::from_str(text)?;
    let Value::Array(rows) = value else {
        return Err(ImportError::NotAnArray);
    };
    let out: Vec<NormalizedDisaster> = rows
        .into_iter()
        .enumerate()
        .map(|(i, row)| import_row(i, row, scales))
        .collect();
    tracing::info!(target: "api", rows = out.len(), "json import parsed");
    Ok(out)
}

fn import_row(index: usize, row: Value, scales: &ScaleTable) -> NormalizedDisaster {
    // Non-object rows behave like objects with every field missing.
    let rec = RawRecord::from_json(row).unwrap_or_default();
    let display = |field: &str| rec.value(field).and_then(RawValue::to_display_string);

    let kind = display("type").unwrap_or_else(|| DEFAULT_TYPE.to_string());
    let magnitude_unit = display("magnitude_unit")
        .or_else(|| scales.unit_for(&kind).map(str::to_string))
        .unwrap_or_default();

    NormalizedDisaster {
        id: display("_id").unwrap_or_else(|| format!("json-{index}")),
        magnitude_value: coerce_number(rec.value("magnitude_value").or(rec.value("magnitude"))),
        latitude: coerce_number(rec.value("latitude")),
        longitude: coerce_number(rec.value("longitude")),
        place: display("place").unwrap_or_default(),
        description: display("description"),
        time: import_time(&rec),
        magnitude_unit,
        source: display("source").unwrap_or_else(|| DEFAULT_SOURCE.to_string()),
        kind,
    }
}

/// Epoch milliseconds are accepted here on top of the usual time formats.
fn import_time(rec: &RawRecord) -> Timestamp {
    match rec.value("time").or(rec.value("date_time")) {
        Some(RawValue::Number(ms)) => Timestamp::from_millis(*ms as i64),
        _ => parse_instant(rec),
    }
}

/// `Number(x)`-style coercion, with `0` where that would give NaN.
/// Non-finite results (`"Infinity"`, `"NaN"`, overflow) are `0` as well.
fn coerce_number(value: Option<&RawValue>) -> f64 {
    let n = match value {
        Some(RawValue::Number(n)) => *n,
        Some(RawValue::Bool(b)) => f64::from(u8::from(*b)),
        Some(RawValue::Text(s)) => {
            let t = s.trim();
            if t.is_empty() {
                0.0
            } else {
                t.parse::<f64>().unwrap_or(0.0)
            }
        }
        _ => 0.0,
    };
    if n.is_finite() {
        n
    } else {
        0.0
    }
}
