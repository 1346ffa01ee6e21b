// src/store/record.rs
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// One field of a raw document, as the store driver hands it over.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    /// Native temporal value (BSON date, `{"$date": ...}` in JSON).
    DateTime(DateTime<Utc>),
    /// Nested documents, arrays and anything else we never interpret.
    Other(Value),
}

impl RawValue {
    /// Decode a JSON value, recognizing the extended-JSON `$date` / `$oid` wrappers
    /// that document-store exports use.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => RawValue::Null,
            Value::Bool(b) => RawValue::Bool(b),
            Value::Number(n) => n.as_f64().map_or(RawValue::Null, RawValue::Number),
            Value::String(s) => RawValue::Text(s),
            Value::Object(map) => {
                extended_json(&map).unwrap_or_else(|| RawValue::Other(Value::Object(map)))
            }
            other @ Value::Array(_) => RawValue::Other(other),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            RawValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            RawValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            RawValue::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, RawValue::Null)
    }

    /// String form used for ids and free text. `None` for null.
    pub fn to_display_string(&self) -> Option<String> {
        match self {
            RawValue::Null => None,
            RawValue::Bool(b) => Some(b.to_string()),
            RawValue::Number(n) => Some(format_number(*n)),
            RawValue::Text(s) => Some(s.clone()),
            RawValue::DateTime(dt) => Some(dt.to_rfc3339()),
            RawValue::Other(v) => Some(v.to_string()),
        }
    }
}

fn extended_json(map: &Map<String, Value>) -> Option<RawValue> {
    if map.len() != 1 {
        return None;
    }
    if let Some(Value::String(oid)) = map.get("$oid") {
        return Some(RawValue::Text(oid.clone()));
    }
    let millis = match map.get("$date")? {
        Value::String(s) => {
            return DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| RawValue::DateTime(dt.with_timezone(&Utc)))
        }
        Value::Number(n) => n.as_i64()?,
        Value::Object(inner) => inner.get("$numberLong")?.as_str()?.parse::<i64>().ok()?,
        _ => return None,
    };
    Utc.timestamp_millis_opt(millis)
        .single()
        .map(RawValue::DateTime)
}

/// Integral values print without a fractional part (`42`, not `42.0`).
fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

impl From<f64> for RawValue {
    fn from(n: f64) -> Self {
        RawValue::Number(n)
    }
}

impl From<bool> for RawValue {
    fn from(b: bool) -> Self {
        RawValue::Bool(b)
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        RawValue::Text(s)
    }
}

impl From<DateTime<Utc>> for RawValue {
    fn from(dt: DateTime<Utc>) -> Self {
        RawValue::DateTime(dt)
    }
}

/// An untyped document whose shape depends on the collection it came from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    fields: BTreeMap<String, RawValue>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, handy for fixtures.
    pub fn with(mut self, key: &str, value: impl Into<RawValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<RawValue>) {
        self.fields.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&RawValue> {
        self.fields.get(key)
    }

    /// Present and not null.
    pub fn value(&self, key: &str) -> Option<&RawValue> {
        self.get(key).filter(|v| !v.is_null())
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(RawValue::as_text)
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(RawValue::as_number)
    }

    /// Stable identifier: `_id`, else `id`, else empty.
    pub fn id(&self) -> String {
        self.value("_id")
            .or_else(|| self.value("id"))
            .and_then(RawValue::to_display_string)
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Decode one JSON document. Fails when the value is not an object.
    pub fn from_json(value: Value) -> Result<Self, String> {
        match value {
            Value::Object(map) => Ok(Self {
                fields: map
                    .into_iter()
                    .map(|(k, v)| (k, RawValue::from_json(v)))
                    .collect(),
            }),
            other => Err(format!("expected an object, got {}", json_kind(&other))),
        }
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
