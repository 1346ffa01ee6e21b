//! # Aggregator
//! Summary statistics for the dashboard's statistics view.
//!
//! Computed for the whole record set (`"all"`) and for each type partition:
//! count, strongest/weakest/average magnitude, an equal-width histogram over
//! the type's magnitude scale, the top-N records and a bucketed time series.
//! Nothing is cached; every call recomputes from its inputs.

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

use crate::normalize::NormalizedDisaster;
use crate::scale::{color_for_magnitude, ScaleTable, FALLBACK_COLOR_SCALE};
use crate::window::Range;

/// Label of the group covering every record.
pub const ALL_TYPES: &str = "all";

/// How time-series buckets are ordered.
///
/// `Lexical` sorts by label text, so `"10 min"` comes before `"9 min"`.
/// `Chronological` sorts by the earliest instant seen in each bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BucketOrder {
    #[default]
    Lexical,
    Chronological,
}

impl FromStr for BucketOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lexical" => Ok(BucketOrder::Lexical),
            "chronological" => Ok(BucketOrder::Chronological),
            other => Err(format!("unknown bucket order '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatsOptions {
    pub top_n: usize,
    pub bins: usize,
    pub bucket_order: BucketOrder,
    /// Count values equal to the scale maximum in the last bin.
    pub last_bin_inclusive: bool,
}

impl Default for StatsOptions {
    fn default() -> Self {
        Self {
            top_n: 4,
            bins: 8,
            bucket_order: BucketOrder::Lexical,
            last_bin_inclusive: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bin {
    pub range: String,
    pub start: f64,
    pub end: f64,
    pub count: usize,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimePoint {
    pub time: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStats {
    #[serde(rename = "type")]
    pub kind: String,
    pub count: usize,
    pub strongest: f64,
    pub weakest: f64,
    pub average: f64,
    pub magnitude_distribution: Vec<Bin>,
    pub top: Vec<NormalizedDisaster>,
    pub time_series: Vec<TimePoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeCount {
    #[serde(rename = "type")]
    pub kind: String,
    pub count: usize,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionCount {
    pub region: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statistics {
    pub range: Range,
    pub overall: GroupStats,
    pub by_type: Vec<GroupStats>,
    pub type_counts: Vec<TypeCount>,
    pub region_counts: Vec<RegionCount>,
}

impl Statistics {
    /// Keep only one type section (`"all"` keeps everything).
    pub fn select_type(mut self, kind: &str) -> Self {
        if kind != ALL_TYPES {
            self.by_type.retain(|g| g.kind == kind);
        }
        self
    }
}

/// `Math.round(x * 10) / 10`: halves round up.
pub fn round_one_decimal(x: f64) -> f64 {
    (x * 10.0 + 0.5).floor() / 10.0
}

/// `(strongest, weakest, average)`; all zero for an empty slice.
pub fn magnitude_summary(mags: &[f64]) -> (f64, f64, f64) {
    if mags.is_empty() {
        return (0.0, 0.0, 0.0);
    }
    let strongest = mags.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let weakest = mags.iter().copied().fold(f64::INFINITY, f64::min);
    let average = mags.iter().sum::<f64>() / mags.len() as f64;
    (strongest, weakest, round_one_decimal(average))
}

/// Equal-width bins over `[0, max_scale]`, each counting `[start, end)`.
pub fn histogram(
    mags: &[f64],
    max_scale: f64,
    bins: usize,
    last_bin_inclusive: bool,
    color_scale: f64,
) -> Vec<Bin> {
    if bins == 0 {
        return Vec::new();
    }
    let width = max_scale / bins as f64;
    (0..bins)
        .map(|i| {
            let start = i as f64 * width;
            let last = i + 1 == bins;
            let end = if last { max_scale } else { start + width };
            let count = mags
                .iter()
                .filter(|&&m| m >= start && (m < end || (last && last_bin_inclusive && m == end)))
                .count();
            Bin {
                range: format!("{start:.0}–{end:.0}"),
                start,
                end,
                count,
                color: color_for_magnitude((start + end) / 2.0, color_scale),
            }
        })
        .collect()
}

/// The `n` strongest records, descending; equal magnitudes keep input order.
pub fn top_n(records: &[NormalizedDisaster], n: usize) -> Vec<NormalizedDisaster> {
    let mut sorted = records.to_vec();
    sorted.sort_by(|a, b| b.magnitude_value.total_cmp(&a.magnitude_value));
    sorted.truncate(n);
    sorted
}

/// Calendar bucket label for one instant (UTC).
pub fn bucket_label(t: DateTime<Utc>, range: Range) -> String {
    match range {
        Range::Hour => format!("{} min", t.minute()),
        Range::Day => format!("{}:00", t.hour()),
        Range::Week => t.format("%a %b %d %Y").to_string(),
        Range::Month => format!("Week {} - {}", t.day().div_ceil(7), t.format("%b")),
    }
}

/// Count records per bucket. Records with an invalid time are skipped.
pub fn time_series(
    records: &[NormalizedDisaster],
    range: Range,
    order: BucketOrder,
) -> Vec<TimePoint> {
    let mut buckets: HashMap<String, (usize, DateTime<Utc>)> = HashMap::new();
    for t in records.iter().filter_map(|r| r.time.get()) {
        let entry = buckets.entry(bucket_label(t, range)).or_insert((0, t));
        entry.0 += 1;
        if t < entry.1 {
            entry.1 = t;
        }
    }

    let mut points: Vec<(String, (usize, DateTime<Utc>))> = buckets.into_iter().collect();
    match order {
        BucketOrder::Lexical => points.sort_by(|a, b| a.0.cmp(&b.0)),
        BucketOrder::Chronological => {
            points.sort_by(|a, b| a.1 .1.cmp(&b.1 .1).then_with(|| a.0.cmp(&b.0)))
        }
    }
    points
        .into_iter()
        .map(|(time, (count, _))| TimePoint { time, count })
        .collect()
}

/// Split by `type`, groups in first-seen order.
pub fn partition_by_type(records: &[NormalizedDisaster]) -> Vec<(String, Vec<NormalizedDisaster>)> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<NormalizedDisaster>)> = Vec::new();
    for r in records {
        let slot = *index.entry(r.kind.as_str()).or_insert_with(|| {
            groups.push((r.kind.clone(), Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(r.clone());
    }
    groups
}

/// Statistics for one group of records labelled `kind`.
pub fn group_stats(
    kind: &str,
    records: &[NormalizedDisaster],
    range: Range,
    scales: &ScaleTable,
    opts: &StatsOptions,
) -> GroupStats {
    let mags: Vec<f64> = records.iter().map(|r| r.magnitude_value).collect();
    let (strongest, weakest, average) = magnitude_summary(&mags);

    let observed_max = mags.iter().copied().fold(1.0, f64::max);
    let max_scale = scales.max_for(kind).unwrap_or(observed_max);
    let color_scale = scales.max_for(kind).unwrap_or(FALLBACK_COLOR_SCALE);

    GroupStats {
        kind: kind.to_string(),
        count: records.len(),
        strongest,
        weakest,
        average,
        magnitude_distribution: histogram(
            &mags,
            max_scale,
            opts.bins,
            opts.last_bin_inclusive,
            color_scale,
        ),
        top: top_n(records, opts.top_n),
        time_series: time_series(records, range, opts.bucket_order),
    }
}

fn region_of(place: &str) -> &str {
    match place.split(", ").last() {
        Some(r) if !r.is_empty() => r,
        _ => "Unknown",
    }
}

fn region_counts(records: &[NormalizedDisaster]) -> Vec<RegionCount> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut out: Vec<RegionCount> = Vec::new();
    for r in records {
        let region = region_of(&r.place);
        match index.get(region) {
            Some(&i) => out[i].count += 1,
            None => {
                index.insert(region, out.len());
                out.push(RegionCount {
                    region: region.to_string(),
                    count: 1,
                });
            }
        }
    }
    out
}

/// Full statistics view for a filtered record set.
pub fn aggregate(
    records: &[NormalizedDisaster],
    range: Range,
    scales: &ScaleTable,
    opts: &StatsOptions,
) -> Statistics {
    let partitions = partition_by_type(records);
    let total = records.len();

    let type_counts = partitions
        .iter()
        .map(|(kind, list)| TypeCount {
            kind: kind.clone(),
            count: list.len(),
            percent: list.len() as f64 / total as f64 * 100.0,
        })
        .collect();

    let by_type = partitions
        .iter()
        .map(|(kind, list)| group_stats(kind, list, range, scales, opts))
        .collect();

    Statistics {
        range,
        overall: group_stats(ALL_TYPES, records, range, scales, opts),
        by_type,
        type_counts,
        region_counts: region_counts(records),
    }
}
