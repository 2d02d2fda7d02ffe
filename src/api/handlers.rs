use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::alerts::Alert;
use crate::ingest::{EventPipeline, IngestOutcome};
use crate::preprocess::ChannelMeta;
use crate::storage::{AlertRepository, AuditRepository, RawEventRecord};
use crate::thresholds::{ThresholdEntry, ThresholdStore};

/// Application state shared across handlers
pub struct AppState {
    pub thresholds: Arc<ThresholdStore>,
    pub alerts: Arc<dyn AlertRepository>,
    pub audit: Arc<dyn AuditRepository>,
    pub pipeline: Arc<EventPipeline>,
}

// ============================================================================
// Health Check
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ============================================================================
// Ingest
// ============================================================================

#[derive(Deserialize)]
pub struct IngestParams {
    /// Channel to attribute the message to; selects the preprocessor
    pub channel: Option<String>,
}

#[derive(Serialize)]
pub struct IngestResponse {
    pub alerts: usize,
}

pub async fn ingest(
    State(state): State<Arc<AppState>>,
    Query(params): Query<IngestParams>,
    body: String,
) -> Result<Json<IngestResponse>, ApiError> {
    let meta = ChannelMeta {
        routing_key: params.channel,
        queue: None,
    };

    match state.pipeline.handle(body.as_bytes(), &meta) {
        IngestOutcome::Processed { alerts } => Ok(Json(IngestResponse { alerts })),
        IngestOutcome::Malformed => Err(ApiError::BadRequest(
            "payload could not be canonicalized".to_string(),
        )),
    }
}

// ============================================================================
// Thresholds
// ============================================================================

#[derive(Deserialize)]
pub struct ThresholdSelector {
    pub module: Option<String>,
    pub metric: Option<String>,
}

/// One entry when both selectors are given, the full listing otherwise
#[derive(Serialize)]
#[serde(untagged)]
pub enum ThresholdListing {
    One(ThresholdEntry),
    Many(Vec<ThresholdEntry>),
}

pub async fn get_thresholds(
    State(state): State<Arc<AppState>>,
    Query(selector): Query<ThresholdSelector>,
) -> Result<Json<ThresholdListing>, ApiError> {
    match (selector.module, selector.metric) {
        (Some(module), Some(metric)) => {
            let range = state.thresholds.get(&module, &metric).ok_or_else(|| {
                ApiError::NotFound(format!("No threshold for {}/{}", module, metric))
            })?;
            Ok(Json(ThresholdListing::One(ThresholdEntry {
                module,
                metric,
                min: range.min,
                max: range.max,
            })))
        }
        (None, None) => Ok(Json(ThresholdListing::Many(state.thresholds.list()))),
        _ => Err(ApiError::BadRequest(
            "module and metric must be provided together".to_string(),
        )),
    }
}

#[derive(Deserialize)]
pub struct UpsertThresholdRequest {
    pub module: String,
    pub metric: String,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

/// Create or update a threshold.
///
/// The inverted-range check lives here, at the boundary; the store itself
/// accepts whatever it is given.
pub async fn upsert_threshold(
    State(state): State<Arc<AppState>>,
    Json(request): Json<UpsertThresholdRequest>,
) -> Result<StatusCode, ApiError> {
    if request.module.trim().is_empty() || request.metric.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "module and metric are required".to_string(),
        ));
    }
    if let (Some(min), Some(max)) = (request.min, request.max) {
        if min > max {
            return Err(ApiError::BadRequest("min must be <= max".to_string()));
        }
    }

    state
        .thresholds
        .set(&request.module, &request.metric, request.min, request.max);
    Ok(StatusCode::CREATED)
}

pub async fn delete_threshold(
    State(state): State<Arc<AppState>>,
    Query(selector): Query<ThresholdSelector>,
) -> Result<StatusCode, ApiError> {
    let (Some(module), Some(metric)) = (selector.module, selector.metric) else {
        return Err(ApiError::BadRequest(
            "module and metric are required".to_string(),
        ));
    };

    state.thresholds.delete(&module, &metric);
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Alert / Audit Browsing
// ============================================================================

#[derive(Deserialize)]
pub struct RecentParams {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    100
}

pub async fn list_alerts(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RecentParams>,
) -> Result<Json<Vec<Alert>>, ApiError> {
    let alerts = state
        .alerts
        .recent(params.limit)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(alerts))
}

pub async fn list_raw_events(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RecentParams>,
) -> Result<Json<Vec<RawEventRecord>>, ApiError> {
    let records = state
        .audit
        .recent(params.limit)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(records))
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}
