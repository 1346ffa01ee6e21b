//! # Magnitude scales
//!
//! Per-type lookup tables shared by the statistics view, the map markers
//! and the JSON import:
//! - maximum scale per disaster type (histogram span, colour ramp),
//! - default magnitude unit per type,
//! - marker colour and icon.
//!
//! Magnitudes are not comparable across types (Richter vs. acres burned),
//! so every lookup is keyed by the canonical type label.

use std::collections::HashMap;

/// Scale used for colouring when a type has no entry.
pub const FALLBACK_COLOR_SCALE: f64 = 10.0;

#[derive(Debug, Clone)]
pub struct ScaleTable {
    max_by_type: HashMap<String, f64>,
    default_units: HashMap<String, String>,
}

impl Default for ScaleTable {
    fn default() -> Self {
        Self::default_seed()
    }
}

impl ScaleTable {
    /// Built-in seed covering the types USGS, EONET and GDACS emit.
    pub fn default_seed() -> Self {
        let mut max_by_type = HashMap::new();
        for (k, v) in [
            ("Earthquake", 10.0),
            ("Wildfires", 10_000.0),
            ("Severe Storms", 200.0),
            ("Tropical Cyclone", 300.0),
            ("Flood", 8.0),
            ("Drought", 8.0),
            ("Volcanoes", 8.0),
            ("Sea and Lake Ice", 1_000.0),
        ] {
            max_by_type.insert(k.to_string(), v);
        }

        let mut default_units = HashMap::new();
        for (k, v) in [
            ("Earthquake", "Richter"),
            ("Wildfires", "acres"),
            ("Severe Storms", "kts"),
            ("Tropical Cyclone", "km/h"),
            ("Sea and Lake Ice", "NM^2"),
        ] {
            default_units.insert(k.to_string(), v.to_string());
        }

        Self {
            max_by_type,
            default_units,
        }
    }

    /// An empty table (every lookup misses).
    pub fn empty() -> Self {
        Self {
            max_by_type: HashMap::new(),
            default_units: HashMap::new(),
        }
    }

    /// Merge config overrides on top of the current table.
    /// Non-positive or non-finite scales are ignored.
    pub fn with_overrides(
        mut self,
        scales: &HashMap<String, f64>,
        units: &HashMap<String, String>,
    ) -> Self {
        for (k, &v) in scales {
            if v.is_finite() && v > 0.0 {
                self.max_by_type.insert(k.clone(), v);
            }
        }
        for (k, v) in units {
            self.default_units.insert(k.clone(), v.clone());
        }
        self
    }

    pub fn max_for(&self, kind: &str) -> Option<f64> {
        self.max_by_type.get(kind).copied()
    }

    pub fn unit_for(&self, kind: &str) -> Option<&str> {
        self.default_units.get(kind).map(String::as_str)
    }
}

/// Green (weak) to red (strong) ramp, as a CSS `hsl()` colour.
pub fn color_for_magnitude(value: f64, max: f64) -> String {
    let ratio = if max > 0.0 && value.is_finite() {
        (value / max).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let hue = (1.0 - ratio) * 120.0;
    format!("hsl({hue:.0}, 100%, 45%)")
}

/// Marker icon asset for a disaster type.
pub fn icon_for_type(kind: &str) -> &'static str {
    match kind {
        "Earthquake" => "earthquake.png",
        "Wildfires" => "wildfire.png",
        "Sea and Lake Ice" => "glacier.png",
        "Flood" => "flood.png",
        _ => "explosion.png",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_has_earthquake_defaults() {
        let t = ScaleTable::default();
        assert_eq!(t.max_for("Earthquake"), Some(10.0));
        assert_eq!(t.unit_for("Earthquake"), Some("Richter"));
        assert_eq!(t.unit_for("Wildfires"), Some("acres"));
        assert_eq!(t.max_for("Meteor"), None);
    }

    #[test]
    fn overrides_replace_and_ignore_bad_values() {
        let scales = HashMap::from([
            ("Earthquake".to_string(), 8.0),
            ("Flood".to_string(), -1.0),
        ]);
        let units = HashMap::from([("Flood".to_string(), "m".to_string())]);
        let t = ScaleTable::default().with_overrides(&scales, &units);
        assert_eq!(t.max_for("Earthquake"), Some(8.0));
        assert_eq!(t.max_for("Flood"), Some(8.0));
        assert_eq!(t.unit_for("Flood"), Some("m"));
    }

    #[test]
    fn color_ramp_endpoints_and_clamp() {
        assert_eq!(color_for_magnitude(0.0, 10.0), "hsl(120, 100%, 45%)");
        assert_eq!(color_for_magnitude(10.0, 10.0), "hsl(0, 100%, 45%)");
        assert_eq!(color_for_magnitude(50.0, 10.0), "hsl(0, 100%, 45%)");
        assert_eq!(color_for_magnitude(5.0, 0.0), "hsl(120, 100%, 45%)");
    }

    #[test]
    fn unknown_types_get_generic_icon() {
        assert_eq!(icon_for_type("Flood"), "flood.png");
        assert_eq!(icon_for_type("Drought"), "explosion.png");
    }
}
