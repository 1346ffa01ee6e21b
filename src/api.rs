use std::sync::Arc;

use axum::{
    extract::{
        rejection::{QueryRejection, StringRejection},
        Query, State,
    },
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::clock::{Clock, FixedClock, SystemClock};
use crate::config::DashboardConfig;
use crate::error::{ImportError, QueryError, StoreError};
use crate::feed::{filter_min_magnitude, UsgsFeed};
use crate::import::import_json;
use crate::markers::{markers, MapMarker};
use crate::query::{run_query, QueryOutput};
use crate::scale::ScaleTable;
use crate::source::Source;
use crate::stats::{aggregate, StatsOptions, Statistics, ALL_TYPES};
use crate::store::{build_store, DocumentStore};
use crate::window::Range;

static X_RECORDS_READ: HeaderName = HeaderName::from_static("x-records-read");
static X_PARSE_ANOMALIES: HeaderName = HeaderName::from_static("x-parse-anomalies");

/// Shared handles built once by the composition root.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub clock: Arc<dyn Clock>,
    pub scales: Arc<ScaleTable>,
    pub stats: StatsOptions,
    pub feed: Arc<UsgsFeed>,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            scales: Arc::new(ScaleTable::default()),
            stats: StatsOptions::default(),
            feed: Arc::new(UsgsFeed::default()),
        }
    }

    pub fn from_config(cfg: &DashboardConfig) -> anyhow::Result<Self> {
        let store = build_store(&cfg.store)?;
        let clock: Arc<dyn Clock> = match cfg.reference_now {
            Some(now) => {
                tracing::info!(target: "api", %now, "reference time pinned");
                Arc::new(FixedClock(now))
            }
            None => Arc::new(SystemClock),
        };
        let scales = ScaleTable::default().with_overrides(&cfg.scales, &cfg.units);
        Ok(Self {
            store,
            clock,
            scales: Arc::new(scales),
            stats: cfg.stats.options(),
            feed: Arc::new(UsgsFeed::new(cfg.usgs_feed_url.clone())),
        })
    }

    pub fn with_scales(mut self, scales: ScaleTable) -> Self {
        self.scales = Arc::new(scales);
        self
    }

    pub fn with_stats(mut self, stats: StatsOptions) -> Self {
        self.stats = stats;
        self
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/batchDisaster", get(batch_disaster))
        .route("/api/collections", get(collections))
        .route("/api/statistics", get(statistics))
        .route("/api/map", get(map_markers))
        .route("/api/import", post(import))
        .route("/api/live/usgs", get(live_usgs))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// `{ "error": "..." }` with a client- or server-fault status.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn server(message: String) -> Self {
        tracing::warn!(target: "api", error = %message, "server fault");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message,
        }
    }
}

impl From<QueryError> for ApiError {
    fn from(e: QueryError) -> Self {
        if e.is_client_fault() {
            Self {
                status: StatusCode::BAD_REQUEST,
                message: e.to_string(),
            }
        } else {
            Self::server(e.to_string())
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        QueryError::from(e).into()
    }
}

impl From<ImportError> for ApiError {
    fn from(e: ImportError) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: e.to_string(),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(e: QueryRejection) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: e.body_text(),
        }
    }
}

impl From<StringRejection> for ApiError {
    fn from(e: StringRejection) -> Self {
        Self {
            status: e.status(),
            message: e.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "error": self.message }))).into_response()
    }
}

fn parse_range(raw: Option<&str>) -> Result<Range, QueryError> {
    raw.map_or(Ok(Range::default()), str::parse)
}

/// Params of the stored-collection endpoints.
#[derive(Debug, Default, Deserialize)]
struct QueryParams {
    collection: Option<String>,
    range: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

impl QueryParams {
    fn source(&self) -> Result<Source, QueryError> {
        self.collection
            .as_deref()
            .map_or(Ok(Source::default()), str::parse)
    }

    fn range(&self) -> Result<Range, QueryError> {
        parse_range(self.range.as_deref())
    }
}

/// Params of the live feed endpoint.
#[derive(Debug, Default, Deserialize)]
struct LiveParams {
    range: Option<String>,
    min_magnitude: Option<f64>,
}

#[derive(Serialize)]
struct DataResponse<T> {
    data: T,
}

/// Validate params (before touching the store) and run the pipeline.
async fn query_from(state: &AppState, q: &QueryParams) -> Result<(Range, QueryOutput), ApiError> {
    let source = q.source()?;
    let range = q.range()?;
    let out = run_query(state.store.as_ref(), source, range, state.clock.now()).await?;
    Ok((range, out))
}

async fn batch_disaster(
    State(state): State<AppState>,
    q: Result<Query<QueryParams>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(q) = q?;
    let (_, out) = query_from(&state, &q).await?;
    let d = out.diagnostics;
    let mut resp = Json(DataResponse { data: out.data }).into_response();
    let headers = resp.headers_mut();
    headers.insert(X_RECORDS_READ.clone(), HeaderValue::from(d.read));
    headers.insert(X_PARSE_ANOMALIES.clone(), HeaderValue::from(d.anomalies()));
    Ok(resp)
}

async fn collections(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(state.store.list_collections().await?))
}

async fn statistics(
    State(state): State<AppState>,
    q: Result<Query<QueryParams>, QueryRejection>,
) -> Result<Json<Statistics>, ApiError> {
    let Query(q) = q?;
    let (range, out) = query_from(&state, &q).await?;
    let stats = aggregate(&out.data, range, &state.scales, &state.stats);
    Ok(Json(stats.select_type(q.kind.as_deref().unwrap_or(ALL_TYPES))))
}

async fn map_markers(
    State(state): State<AppState>,
    q: Result<Query<QueryParams>, QueryRejection>,
) -> Result<Json<Vec<MapMarker>>, ApiError> {
    let Query(q) = q?;
    let (_, out) = query_from(&state, &q).await?;
    Ok(Json(markers(&out.data, &state.scales)))
}

async fn import(
    State(state): State<AppState>,
    body: Result<String, StringRejection>,
) -> Result<Response, ApiError> {
    let data = import_json(&body?, &state.scales)?;
    Ok(Json(DataResponse { data }).into_response())
}

async fn live_usgs(
    State(state): State<AppState>,
    q: Result<Query<LiveParams>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(q) = q?;
    let range = parse_range(q.range.as_deref())?;
    let data = state
        .feed
        .fetch(range)
        .await
        .map_err(|e| ApiError::server(format!("{e:#}")))?;
    let data = match q.min_magnitude {
        Some(min) => filter_min_magnitude(data, min),
        None => data,
    };
    Ok(Json(DataResponse { data }).into_response())
}
