// tests/config_load.rs
use disaster_dashboard::config::{DashboardConfig, StoreConfig};
use disaster_dashboard::stats::BucketOrder;
use std::path::PathBuf;
use std::{env, fs};

const ENV_VARS: [&str; 5] = [
    "DASHBOARD_CONFIG_PATH",
    "DASHBOARD_STORE_URI",
    "DASHBOARD_DATA_DIR",
    "DASHBOARD_REFERENCE_NOW",
    "DASHBOARD_BUCKET_ORDER",
];

fn clear_env() {
    for v in ENV_VARS {
        env::remove_var(v);
    }
}

#[test]
fn parse_toml_and_json_paths() {
    let dir = tempfile::tempdir().unwrap();

    let p_toml = dir.path().join("dashboard.toml");
    fs::write(
        &p_toml,
        r#"
reference_now = "2025-04-30T23:58:52.660Z"

[store]
backend = "json_dir"
data_dir = "fixtures/db"

[stats]
top_n = 5
bucket_order = "chronological"
last_bin_inclusive = false

[scales]
Flood = 8.0

[units]
Flood = "m"
"#,
    )
    .unwrap();
    let cfg = DashboardConfig::load_from(&p_toml).unwrap();
    assert_eq!(
        cfg.store,
        StoreConfig::JsonDir {
            data_dir: PathBuf::from("fixtures/db")
        }
    );
    assert_eq!(
        cfg.reference_now.map(|t| t.timestamp_millis()),
        Some(1_746_057_532_660)
    );
    let opts = cfg.stats.options();
    assert_eq!(opts.top_n, 5);
    assert_eq!(opts.bins, 8);
    assert_eq!(opts.bucket_order, BucketOrder::Chronological);
    assert!(!opts.last_bin_inclusive);
    assert_eq!(cfg.units.get("Flood").map(String::as_str), Some("m"));

    let p_json = dir.path().join("dashboard.json");
    fs::write(
        &p_json,
        r#"{"store": {"backend": "mongo", "database": "archive"}}"#,
    )
    .unwrap();
    let cj = DashboardConfig::load_from(&p_json).unwrap();
    assert_eq!(
        cj.store,
        StoreConfig::Mongo {
            uri: "mongodb://localhost:27017".into(),
            database: "archive".into()
        }
    );
}

#[test]
fn unknown_backend_is_an_error() {
    assert!(DashboardConfig::from_toml_str("[store]\nbackend = \"sqlite\"\n").is_err());
}

#[serial_test::serial]
#[test]
fn default_uses_env_then_fallbacks() {
    // Isolate CWD so the repo's own config/ is not read.
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();
    clear_env();

    // 1) Nothing at all -> defaults
    let cfg = DashboardConfig::load_default().unwrap();
    assert_eq!(cfg, DashboardConfig::default());

    // 2) Fallback TOML in ./config/
    fs::create_dir_all("config").unwrap();
    fs::write("config/dashboard.toml", "[stats]\ntop_n = 2\n").unwrap();
    assert_eq!(DashboardConfig::load_default().unwrap().stats.top_n, 2);

    // 3) Explicit path wins over the fallback
    let explicit = tmp.path().join("other.json");
    fs::write(&explicit, r#"{"stats": {"top_n": 7}}"#).unwrap();
    env::set_var("DASHBOARD_CONFIG_PATH", &explicit);
    assert_eq!(DashboardConfig::load_default().unwrap().stats.top_n, 7);

    // 4) Explicit path that does not exist is an error
    env::set_var("DASHBOARD_CONFIG_PATH", tmp.path().join("missing.toml"));
    assert!(DashboardConfig::load_default().is_err());
    env::remove_var("DASHBOARD_CONFIG_PATH");

    env::set_current_dir(old).unwrap();
    clear_env();
}

#[serial_test::serial]
#[test]
fn env_overrides_apply_on_top_of_file() {
    clear_env();
    env::set_var("DASHBOARD_DATA_DIR", "/srv/disasters");
    env::set_var("DASHBOARD_BUCKET_ORDER", "Chronological");
    env::set_var("DASHBOARD_REFERENCE_NOW", "2025-04-30T23:58:52.660Z");

    let mut cfg = DashboardConfig::default();
    cfg.apply_env_overrides();
    assert_eq!(
        cfg.store,
        StoreConfig::JsonDir {
            data_dir: PathBuf::from("/srv/disasters")
        }
    );
    assert_eq!(cfg.stats.bucket_order, BucketOrder::Chronological);
    assert!(cfg.reference_now.is_some());

    // Store URI switches to the mongo backend, default database.
    env::set_var("DASHBOARD_STORE_URI", "mongodb://db.internal:27017");
    cfg.apply_env_overrides();
    assert_eq!(
        cfg.store,
        StoreConfig::Mongo {
            uri: "mongodb://db.internal:27017".into(),
            database: "disasterDB".into()
        }
    );

    // Bad values are ignored, not fatal.
    env::set_var("DASHBOARD_REFERENCE_NOW", "yesterday");
    env::set_var("DASHBOARD_BUCKET_ORDER", "random");
    let mut fresh = DashboardConfig::default();
    fresh.apply_env_overrides();
    assert_eq!(fresh.reference_now, None);
    assert_eq!(fresh.stats.bucket_order, BucketOrder::Lexical);

    clear_env();
}
