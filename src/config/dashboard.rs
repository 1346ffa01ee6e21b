// src/config/dashboard.rs
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::{env, fs};

use crate::feed::DEFAULT_USGS_FEED_URL;
use crate::stats::{BucketOrder, StatsOptions};

pub const ENV_CONFIG_PATH: &str = "DASHBOARD_CONFIG_PATH";
pub const ENV_STORE_URI: &str = "DASHBOARD_STORE_URI";
pub const ENV_DATA_DIR: &str = "DASHBOARD_DATA_DIR";
pub const ENV_REFERENCE_NOW: &str = "DASHBOARD_REFERENCE_NOW";
pub const ENV_BUCKET_ORDER: &str = "DASHBOARD_BUCKET_ORDER";

pub const DEFAULT_TOML_PATH: &str = "config/dashboard.toml";
pub const DEFAULT_JSON_PATH: &str = "config/dashboard.json";

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_mongo_uri() -> String {
    "mongodb://localhost:27017".to_string()
}
fn default_mongo_database() -> String {
    "disasterDB".to_string()
}
fn default_top_n() -> usize {
    4
}
fn default_bins() -> usize {
    8
}
fn default_true() -> bool {
    true
}
fn default_feed_url() -> String {
    DEFAULT_USGS_FEED_URL.to_string()
}

/// Where raw documents are read from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StoreConfig {
    JsonDir {
        #[serde(default = "default_data_dir")]
        data_dir: PathBuf,
    },
    Mongo {
        #[serde(default = "default_mongo_uri")]
        uri: String,
        #[serde(default = "default_mongo_database")]
        database: String,
    },
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::JsonDir {
            data_dir: default_data_dir(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsConfig {
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    #[serde(default = "default_bins")]
    pub bins: usize,
    #[serde(default)]
    pub bucket_order: BucketOrder,
    #[serde(default = "default_true")]
    pub last_bin_inclusive: bool,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
            bins: default_bins(),
            bucket_order: BucketOrder::default(),
            last_bin_inclusive: true,
        }
    }
}

impl StatsConfig {
    pub fn options(&self) -> StatsOptions {
        StatsOptions {
            top_n: self.top_n,
            bins: self.bins,
            bucket_order: self.bucket_order,
            last_bin_inclusive: self.last_bin_inclusive,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default)]
    pub store: StoreConfig,
    /// Pins the reference "now" (replaying a historical dataset). Wall clock when unset.
    #[serde(default)]
    pub reference_now: Option<DateTime<Utc>>,
    #[serde(default)]
    pub stats: StatsConfig,
    /// Disaster type → maximum magnitude scale, on top of the built-in table.
    #[serde(default)]
    pub scales: HashMap<String, f64>,
    /// Disaster type → default magnitude unit, on top of the built-in table.
    #[serde(default)]
    pub units: HashMap<String, String>,
    #[serde(default = "default_feed_url")]
    pub usgs_feed_url: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            reference_now: None,
            stats: StatsConfig::default(),
            scales: HashMap::new(),
            units: HashMap::new(),
            usgs_feed_url: default_feed_url(),
        }
    }
}

impl DashboardConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(s).context("parsing dashboard toml")?;
        Ok(cfg.sanitized())
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(s).context("parsing dashboard json")?;
        Ok(cfg.sanitized())
    }

    /// Load from an explicit path. Format is picked by extension (TOML unless `.json`).
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading dashboard config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        if ext == "json" {
            Self::from_json_str(&content)
        } else {
            Self::from_toml_str(&content)
        }
    }

    /// Load using env var + fallbacks, then apply env overrides:
    /// 1) $DASHBOARD_CONFIG_PATH
    /// 2) config/dashboard.toml
    /// 3) config/dashboard.json
    /// 4) built-in defaults
    pub fn load_default() -> Result<Self> {
        let mut cfg = if let Ok(p) = env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from(&pb)?
        } else if Path::new(DEFAULT_TOML_PATH).exists() {
            Self::load_from(Path::new(DEFAULT_TOML_PATH))?
        } else if Path::new(DEFAULT_JSON_PATH).exists() {
            Self::load_from(Path::new(DEFAULT_JSON_PATH))?
        } else {
            Self::default()
        };
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(dir) = env::var(ENV_DATA_DIR) {
            self.store = StoreConfig::JsonDir {
                data_dir: PathBuf::from(dir),
            };
        }
        if let Ok(uri) = env::var(ENV_STORE_URI) {
            let database = match &self.store {
                StoreConfig::Mongo { database, .. } => database.clone(),
                StoreConfig::JsonDir { .. } => default_mongo_database(),
            };
            self.store = StoreConfig::Mongo { uri, database };
        }
        if let Ok(raw) = env::var(ENV_REFERENCE_NOW) {
            match DateTime::parse_from_rfc3339(raw.trim()) {
                Ok(dt) => self.reference_now = Some(dt.with_timezone(&Utc)),
                Err(e) => {
                    tracing::warn!(error = %e, value = %raw, "ignoring invalid {ENV_REFERENCE_NOW}")
                }
            }
        }
        if let Ok(raw) = env::var(ENV_BUCKET_ORDER) {
            match raw.parse::<BucketOrder>() {
                Ok(order) => self.stats.bucket_order = order,
                Err(e) => tracing::warn!(error = %e, "ignoring {ENV_BUCKET_ORDER}"),
            }
        }
    }

    fn sanitized(mut self) -> Self {
        if self.stats.bins == 0 {
            self.stats.bins = default_bins();
        }
        self.scales.retain(|_, v| v.is_finite() && *v > 0.0);
        if !self.usgs_feed_url.contains("{range}") {
            self.usgs_feed_url = default_feed_url();
        }
        self
    }
}
