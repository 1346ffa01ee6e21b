//! # Time Parser
//! Turns the heterogeneous time fields of raw documents into one canonical
//! UTC instant.
//!
//! Accepted inputs, in order of preference:
//! - native temporal values in `time` or `date_time`,
//! - `"YYYY-MM-DD HH:mm:ss[.fraction]"` strings (read as UTC),
//! - ISO-8601 / RFC 3339 strings, zoned or not (unzoned read as UTC),
//! - RFC 2822 strings (`"Wed, 30 Apr 2025 12:00:00 +0000"`),
//! - browser `Date` strings (`"Wed Apr 30 2025 12:00:00 GMT+0000"`).
//!
//! Parsing never fails outward: [`parse_instant`] returns an invalid
//! [`Timestamp`] instead, which every window comparison rejects.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, SubsecRound, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Serializer};
use time::{format_description::well_known::Rfc2822, OffsetDateTime};

use crate::error::ParseAnomaly;
use crate::store::RawRecord;

pub const PRIMARY_TIME_FIELD: &str = "time";
pub const SECONDARY_TIME_FIELD: &str = "date_time";

static SPACE_SEPARATED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}(?:\.\d+)?$").expect("space-separated regex")
});

static TRAILING_ZONE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\([^()]*\)$").expect("zone name regex"));

/// A canonical instant, or the invalid-instant sentinel.
///
/// Valid values are truncated to milliseconds so that serializing and
/// re-parsing yields the same instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Timestamp(Option<DateTime<Utc>>);

impl Timestamp {
    pub fn new(dt: DateTime<Utc>) -> Self {
        Self(Some(dt.trunc_subsecs(3)))
    }

    pub fn invalid() -> Self {
        Self(None)
    }

    pub fn from_millis(ms: i64) -> Self {
        Utc.timestamp_millis_opt(ms)
            .single()
            .map_or_else(Self::invalid, Self::new)
    }

    pub fn is_valid(&self) -> bool {
        self.0.is_some()
    }

    pub fn get(&self) -> Option<DateTime<Utc>> {
        self.0
    }

    /// `false` for the invalid sentinel, whatever the bound.
    pub fn at_or_after(&self, bound: DateTime<Utc>) -> bool {
        self.0.is_some_and(|t| t >= bound)
    }

    /// `2025-04-30T12:00:00.000Z`, or `None` when invalid.
    pub fn to_iso(&self) -> Option<String> {
        self.0
            .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::new(dt)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.to_iso() {
            Some(s) => serializer.serialize_str(&s),
            None => serializer.serialize_none(),
        }
    }
}

/// Lenient form used by the normalizer.
pub fn parse_instant(record: &RawRecord) -> Timestamp {
    parse_time(record).map_or_else(|_| Timestamp::invalid(), Timestamp::new)
}

/// Strict form: reports why a record has no usable time.
pub fn parse_time(record: &RawRecord) -> Result<DateTime<Utc>, ParseAnomaly> {
    for field in [PRIMARY_TIME_FIELD, SECONDARY_TIME_FIELD] {
        if let Some(dt) = record.get(field).and_then(|v| v.as_datetime()) {
            return Ok(dt);
        }
    }

    let raw = [PRIMARY_TIME_FIELD, SECONDARY_TIME_FIELD]
        .into_iter()
        .filter_map(|field| record.text(field))
        .find(|s| !s.is_empty())
        .unwrap_or_default();

    parse_time_str(raw)
}

/// Parse a single time string (trimmed first).
pub fn parse_time_str(raw: &str) -> Result<DateTime<Utc>, ParseAnomaly> {
    let s = raw.trim();
    if s.is_empty() {
        return Err(ParseAnomaly::EmptyTime);
    }

    let rewritten;
    let candidate = if SPACE_SEPARATED.is_match(s) {
        rewritten = format!("{}Z", s.replacen(' ', "T", 1));
        rewritten.as_str()
    } else {
        s
    };

    parse_general(candidate).ok_or_else(|| ParseAnomaly::UnparseableTime(s.to_string()))
}

fn parse_general(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    // `%z` does not take a `Z` designator.
    let zoned = match s.strip_suffix(['Z', 'z']) {
        Some(head) => format!("{head}+0000"),
        None => s.to_string(),
    };
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%dT%H:%M%z"] {
        if let Ok(dt) = DateTime::parse_from_str(&zoned, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|n| n.and_utc());
    }

    if let Some(dt) = OffsetDateTime::parse(s, &Rfc2822)
        .ok()
        .and_then(|odt| Utc.timestamp_opt(odt.unix_timestamp(), odt.nanosecond()).single())
    {
        return Some(dt);
    }

    // `Wed Apr 30 2025 12:00:00 GMT+0000 (Coordinated Universal Time)`
    let head = TRAILING_ZONE_NAME.replace(s, "");
    DateTime::parse_from_str(&head, "%a %b %d %Y %H:%M:%S GMT%z")
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
