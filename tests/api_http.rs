// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET /health
// - GET /api/batchDisaster  (defaults, diagnostics headers, 400s, 500, bad query strings)
// - GET /api/collections
// - GET /api/statistics     (type filter)
// - GET /api/map
// - POST /api/import
// - GET /api/live/usgs      (validation and upstream failure)

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::{DateTime, Utc};
use serde_json::Value as Json;
use tower::ServiceExt as _; // for `oneshot`

use disaster_dashboard::api::{router, AppState};
use disaster_dashboard::clock::FixedClock;
use disaster_dashboard::feed::UsgsFeed;
use disaster_dashboard::store::{MemoryStore, RawRecord};

const BODY_LIMIT: usize = 1024 * 1024; // 1MB, safe for tests

fn now() -> DateTime<Utc> {
    "2025-04-30T23:58:52.660Z".parse().unwrap()
}

fn seeded_store() -> MemoryStore {
    MemoryStore::new()
        .with_collection(
            "usgs",
            vec![
                RawRecord::new()
                    .with("_id", "recent")
                    .with("magnitude_value", 4.2)
                    .with("latitude", 35.7)
                    .with("longitude", -117.5)
                    .with("place", "10 km SSW of Ridgecrest, CA")
                    .with("time", "2025-04-30 23:00:00"),
                RawRecord::new()
                    .with("_id", "old")
                    .with("magnitude_value", 5.1)
                    .with("latitude", 0.0)
                    .with("longitude", 0.0)
                    .with("time", "2025-04-30T22:00:00Z"),
                RawRecord::new()
                    .with("_id", "broken")
                    .with("magnitude_value", 1.0)
                    .with("latitude", 0.0)
                    .with("longitude", 0.0)
                    .with("time", "whenever"),
            ],
        )
        .with_collection(
            "eonet",
            vec![
                RawRecord::new()
                    .with("_id", "EONET_1")
                    .with("type", "Wildfire")
                    .with("magnitude_value", 800.0)
                    .with("latitude", 38.0)
                    .with("longitude", -120.0)
                    .with("place", "Yosemite, CA")
                    .with("time", "2025-04-30T12:00:00Z"),
                RawRecord::new()
                    .with("_id", "EONET_2")
                    .with("type", "Severe Storms")
                    .with("magnitude_value", 50.0)
                    .with("latitude", 10.0)
                    .with("longitude", 140.0)
                    .with("time", "2025-04-30T18:00:00Z"),
            ],
        )
}

/// Build the same Router the binary uses, over an in-memory store.
fn test_router() -> Router {
    router(AppState::new(
        Arc::new(seeded_store()),
        Arc::new(FixedClock(now())),
    ))
}

async fn get(app: Router, uri: &str) -> (StatusCode, axum::http::HeaderMap, Json) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build GET");
    let resp = app.oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let headers = resp.headers().clone();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    let v: Json = serde_json::from_slice(&bytes).expect("parse json");
    (status, headers, v)
}

fn ids(v: &Json) -> Vec<String> {
    v["data"]
        .as_array()
        .expect("data array")
        .iter()
        .map(|d| d["_id"].as_str().unwrap_or_default().to_string())
        .collect()
}

#[tokio::test]
async fn api_health_returns_200_and_ok_body() {
    let req = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .expect("build GET /health");
    let resp = test_router().oneshot(req).await.expect("oneshot /health");
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap();
    assert_eq!(String::from_utf8(bytes.to_vec()).unwrap(), "ok");
}

#[tokio::test]
async fn batch_defaults_to_usgs_last_hour() {
    let (status, headers, v) = get(test_router(), "/api/batchDisaster").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&v), vec!["recent"]);

    let d = &v["data"][0];
    assert_eq!(d["type"], "Earthquake");
    assert_eq!(d["magnitude_unit"], "Richter");
    assert_eq!(d["source"], "USGS");
    assert_eq!(d["time"], "2025-04-30T23:00:00.000Z");

    let header = |name: &str| headers.get(name).and_then(|h| h.to_str().ok()).map(str::to_string);
    assert_eq!(header("x-records-read").as_deref(), Some("3"));
    assert_eq!(header("x-parse-anomalies").as_deref(), Some("1"));
}

#[tokio::test]
async fn batch_eonet_day_normalizes_wildfires() {
    let (status, _, v) = get(test_router(), "/api/batchDisaster?collection=eonet&range=day").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&v), vec!["EONET_1", "EONET_2"]);
    assert_eq!(v["data"][0]["type"], "Wildfires");
    assert_eq!(v["data"][0]["magnitude_unit"], "acres");
}

#[tokio::test]
async fn unknown_collection_is_400() {
    let (status, _, v) = get(test_router(), "/api/batchDisaster?collection=nasa").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(v["error"], "Invalid collection: nasa");
}

#[tokio::test]
async fn unknown_range_is_400() {
    let (status, _, v) = get(test_router(), "/api/batchDisaster?range=year").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(v["error"], "Invalid range: year");
}

#[tokio::test]
async fn store_failure_is_500_with_error_body() {
    let app = router(AppState::new(
        Arc::new(MemoryStore::offline()),
        Arc::new(FixedClock(now())),
    ));
    let (status, _, v) = get(app, "/api/batchDisaster").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(v["error"].as_str().unwrap_or_default().contains("offline"));
}

#[tokio::test]
async fn bad_params_are_400_even_when_store_is_down() {
    let offline = || {
        router(AppState::new(
            Arc::new(MemoryStore::offline()),
            Arc::new(FixedClock(now())),
        ))
    };
    for (uri, error) in [
        ("/api/batchDisaster?collection=nasa", "Invalid collection: nasa"),
        ("/api/batchDisaster?range=year", "Invalid range: year"),
        ("/api/statistics?collection=nasa", "Invalid collection: nasa"),
        ("/api/map?range=year", "Invalid range: year"),
    ] {
        let (status, _, v) = get(offline(), uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(v["error"], error, "{uri}");
    }
}

#[tokio::test]
async fn malformed_query_string_is_400_with_error_body() {
    let (status, _, v) = get(
        test_router(),
        "/api/batchDisaster?collection=usgs&collection=eonet",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error = v["error"].as_str().unwrap_or_default();
    assert!(error.starts_with("Failed to deserialize query string"), "{error}");
}

#[tokio::test]
async fn batch_ignores_live_only_params() {
    let (status, _, v) = get(test_router(), "/api/batchDisaster?min_magnitude=abc").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&v), vec!["recent"]);
}

#[tokio::test]
async fn collections_lists_store_contents() {
    let (status, _, v) = get(test_router(), "/api/collections").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v, serde_json::json!(["eonet", "usgs"]));
}

#[tokio::test]
async fn statistics_filters_by_type() {
    let (status, _, v) = get(
        test_router(),
        "/api/statistics?collection=eonet&range=day&type=Wildfires",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["range"], "day");
    assert_eq!(v["overall"]["count"], 2);
    let by_type = v["by_type"].as_array().expect("by_type");
    assert_eq!(by_type.len(), 1);
    assert_eq!(by_type[0]["type"], "Wildfires");
    assert_eq!(by_type[0]["strongest"], 800.0);
    assert_eq!(by_type[0]["magnitude_distribution"].as_array().map(Vec::len), Some(8));
}

#[tokio::test]
async fn map_returns_one_marker_per_record() {
    let (status, _, v) = get(test_router(), "/api/map?collection=eonet&range=day").await;
    assert_eq!(status, StatusCode::OK);
    let markers = v.as_array().expect("marker array");
    assert_eq!(markers.len(), 2);
    assert_eq!(markers[0]["icon"], "wildfire.png");
    assert_eq!(markers[1]["icon"], "explosion.png");
    assert_eq!(markers[0]["popup"][0], "Yosemite, CA");
}

#[tokio::test]
async fn import_accepts_array_and_rejects_object() {
    let ok = Request::builder()
        .method("POST")
        .uri("/api/import")
        .header("content-type", "application/json")
        .body(Body::from(r#"[{"type": "Flood", "magnitude_value": 3}]"#))
        .unwrap();
    let resp = test_router().oneshot(ok).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap();
    let v: Json = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(v["data"][0]["_id"], "json-0");
    assert_eq!(v["data"][0]["source"], "JSON");

    let bad = Request::builder()
        .method("POST")
        .uri("/api/import")
        .body(Body::from(r#"{"type": "Flood"}"#))
        .unwrap();
    let resp = test_router().oneshot(bad).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap();
    let v: Json = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(v["error"], "Failed to parse JSON: JSON must be an array");
}

#[tokio::test]
async fn live_feed_validates_range_before_fetching() {
    let (status, _, v) = get(test_router(), "/api/live/usgs?range=decade").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(v["error"], "Invalid range: decade");
}

#[tokio::test]
async fn live_feed_upstream_failure_is_500() {
    let mut state = AppState::new(Arc::new(seeded_store()), Arc::new(FixedClock(now())));
    // Port 9 (discard) is closed on test hosts; the connect fails fast.
    state.feed = Arc::new(UsgsFeed::new("http://127.0.0.1:9/all_{range}.geojson"));
    let (status, _, v) = get(router(state), "/api/live/usgs?range=hour").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(v["error"].is_string());
}

#[tokio::test]
async fn live_feed_rejects_non_numeric_min_magnitude() {
    let (status, _, v) = get(test_router(), "/api/live/usgs?min_magnitude=abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error = v["error"].as_str().unwrap_or_default();
    assert!(error.starts_with("Failed to deserialize query string"), "{error}");
}
