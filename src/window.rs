//! # Time-Window Filter
//! Relative range selectors (`hour|day|week|month`) and the lower bound they
//! imply for a given reference instant.
//!
//! The reference instant is always passed in; see [`crate::clock`] for where
//! it comes from.

use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::QueryError;
use crate::normalize::NormalizedDisaster;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Range {
    #[default]
    Hour,
    Day,
    Week,
    Month,
}

impl Range {
    pub const ALL: [Range; 4] = [Range::Hour, Range::Day, Range::Week, Range::Month];

    pub fn as_str(self) -> &'static str {
        match self {
            Range::Hour => "hour",
            Range::Day => "day",
            Range::Week => "week",
            Range::Month => "month",
        }
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Range {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Range::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| QueryError::InvalidRange(s.to_string()))
    }
}

/// Earliest instant still inside `range`, counted back from `now`.
///
/// `month` keeps the day-of-month and lets overflow roll into the next
/// month (Mar 31 minus one month is Mar 3 in a non-leap year: "Feb 31").
pub fn lower_bound(now: DateTime<Utc>, range: Range) -> DateTime<Utc> {
    let bound = match range {
        Range::Hour => now.checked_sub_signed(Duration::hours(1)),
        Range::Day => now.checked_sub_days(Days::new(1)),
        Range::Week => now.checked_sub_days(Days::new(7)),
        Range::Month => previous_month_rolling(now),
    };
    bound.unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn previous_month_rolling(now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let (year, month) = match now.month() {
        1 => (now.year() - 1, 12),
        m => (now.year(), m - 1),
    };
    let date = NaiveDate::from_ymd_opt(year, month, 1)?
        .checked_add_days(Days::new(u64::from(now.day() - 1)))?;
    Some(date.and_time(now.time()).and_utc())
}

/// Keep records whose time is at or after `bound`. Invalid times never pass.
pub fn filter_window(records: Vec<NormalizedDisaster>, bound: DateTime<Utc>) -> Vec<NormalizedDisaster> {
    records
        .into_iter()
        .filter(|r| r.time.at_or_after(bound))
        .collect()
}
