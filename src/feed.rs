// src/feed.rs
//! Live USGS earthquake feed (GeoJSON summary feeds), mapped straight onto
//! [`NormalizedDisaster`] so the map view can mix it with stored data.

use anyhow::{Context, Result};
use metrics::counter;
use serde::Deserialize;

use crate::normalize::{NormalizedDisaster, EARTHQUAKE};
use crate::source::Source;
use crate::timeparse::Timestamp;
use crate::window::Range;

pub const DEFAULT_USGS_FEED_URL: &str =
    "https://earthquake.usgs.gov/earthquakes/feed/v1.0/summary/all_{range}.geojson";

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    #[serde(default)]
    id: String,
    geometry: Option<Geometry>,
    properties: Properties,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    /// `[longitude, latitude, depth_km]`
    coordinates: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct Properties {
    mag: Option<f64>,
    place: Option<String>,
    /// Epoch milliseconds.
    time: Option<i64>,
    #[serde(rename = "magType")]
    mag_type: Option<String>,
    title: Option<String>,
}

fn feature_to_disaster(f: Feature) -> NormalizedDisaster {
    let coords = f.geometry.map(|g| g.coordinates).unwrap_or_default();
    let p = f.properties;
    NormalizedDisaster {
        id: f.id,
        magnitude_value: p.mag.unwrap_or(0.0),
        latitude: coords.get(1).copied().unwrap_or(0.0),
        longitude: coords.first().copied().unwrap_or(0.0),
        place: p.place.unwrap_or_default(),
        description: p.title,
        time: p.time.map_or_else(Timestamp::invalid, Timestamp::from_millis),
        magnitude_unit: p.mag_type.unwrap_or_else(|| "Richter".to_string()),
        source: Source::Usgs.tag().to_string(),
        kind: EARTHQUAKE.to_string(),
    }
}

/// Parse a GeoJSON FeatureCollection body.
pub fn parse_feed(body: &str) -> Result<Vec<NormalizedDisaster>> {
    let fc: FeatureCollection = serde_json::from_str(body).context("parsing usgs geojson")?;
    Ok(fc.features.into_iter().map(feature_to_disaster).collect())
}

/// Drop events below `min` (the map's magnitude slider).
pub fn filter_min_magnitude(records: Vec<NormalizedDisaster>, min: f64) -> Vec<NormalizedDisaster> {
    records
        .into_iter()
        .filter(|r| r.magnitude_value >= min)
        .collect()
}

pub struct UsgsFeed {
    client: reqwest::Client,
    url_template: String,
}

impl UsgsFeed {
    /// `url_template` must contain `{range}`.
    pub fn new(url_template: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url_template: url_template.into(),
        }
    }

    pub fn url_for(&self, range: Range) -> String {
        self.url_template.replace("{range}", range.as_str())
    }

    pub async fn fetch(&self, range: Range) -> Result<Vec<NormalizedDisaster>> {
        let url = self.url_for(range);
        let resp = match self.client.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(target: "feed", error = ?e, %url, "usgs feed http error");
                counter!("feed_errors_total").increment(1);
                return Err(e).context("usgs feed get()");
            }
        };
        let status = resp.status();
        if !status.is_success() {
            counter!("feed_errors_total").increment(1);
            anyhow::bail!("Failed to fetch earthquakes: HTTP {status}");
        }
        let body = resp.text().await.context("usgs feed .text()")?;
        let out = parse_feed(&body)?;
        tracing::info!(target: "feed", range = range.as_str(), events = out.len(), "usgs feed fetched");
        Ok(out)
    }
}

impl Default for UsgsFeed {
    fn default() -> Self {
        Self::new(DEFAULT_USGS_FEED_URL)
    }
}
