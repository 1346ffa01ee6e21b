// src/markers.rs
//! Map markers: what the map view needs to draw one pin per record.

use serde::Serialize;

use crate::normalize::NormalizedDisaster;
use crate::scale::{color_for_magnitude, icon_for_type, ScaleTable, FALLBACK_COLOR_SCALE};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapMarker {
    #[serde(rename = "_id")]
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub color: String,
    pub icon: &'static str,
    pub popup: Vec<String>,
}

pub fn marker_for(d: &NormalizedDisaster, scales: &ScaleTable) -> MapMarker {
    let max = scales.max_for(&d.kind).unwrap_or(FALLBACK_COLOR_SCALE);
    MapMarker {
        id: d.id.clone(),
        latitude: d.latitude,
        longitude: d.longitude,
        color: color_for_magnitude(d.magnitude_value, max),
        icon: icon_for_type(&d.kind),
        popup: popup_lines(d),
    }
}

pub fn markers(records: &[NormalizedDisaster], scales: &ScaleTable) -> Vec<MapMarker> {
    records.iter().map(|d| marker_for(d, scales)).collect()
}

fn popup_lines(d: &NormalizedDisaster) -> Vec<String> {
    let mut lines = Vec::with_capacity(6);
    lines.push(if d.place.is_empty() {
        "Unknown location".to_string()
    } else {
        d.place.clone()
    });
    lines.push(format!("Type: {}", d.kind));
    if d.magnitude_unit.is_empty() {
        lines.push(format!("Magnitude: {}", d.magnitude_value));
    } else {
        lines.push(format!("Magnitude: {} {}", d.magnitude_value, d.magnitude_unit));
    }
    if let Some(t) = d.time.to_iso() {
        lines.push(format!("Time: {t}"));
    }
    if !d.source.is_empty() {
        lines.push(format!("Source: {}", d.source));
    }
    if let Some(desc) = d.description.as_deref().filter(|s| !s.is_empty()) {
        lines.push(format!("Description: {desc}"));
    }
    lines
}
