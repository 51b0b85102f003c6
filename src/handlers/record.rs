use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::AppState;

use super::{ApiResponse, AppError};

// ─── Request bodies ──────────────────────────────────────────────
// Every field is optional at the serde level so a missing field turns
// into a field-specific 400 instead of a generic rejection.

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordRequestBody {
    pub method: Option<String>,
    pub path: Option<String>,
    pub status_code: Option<u16>,
    pub duration: Option<f64>,
    pub response_size: Option<u64>,
    pub user_agent: Option<String>,
    pub ip: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RecordDbOperationBody {
    pub operation: Option<String>,
    pub collection: Option<String>,
    pub duration: Option<f64>,
    pub success: Option<bool>,
    pub error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordBandwidthBody {
    pub bytes_in: Option<u64>,
    pub bytes_out: Option<u64>,
    pub requests_per_second: Option<f64>,
}

type Recorded = Result<Json<ApiResponse<()>>, AppError>;

// ─── POST /metrics/record/request ────────────────────────────────

pub async fn record_request(
    State(state): State<Arc<AppState>>,
    body: Result<Json<RecordRequestBody>, JsonRejection>,
) -> Recorded {
    let Json(body) = body.map_err(malformed)?;

    let (Some(method), Some(path), Some(status_code), Some(duration)) = (
        present(body.method),
        present(body.path),
        body.status_code.filter(|&code| code != 0),
        body.duration,
    ) else {
        return Err(AppError::Validation(
            "The fields method, path, statusCode and duration are required".into(),
        ));
    };

    state.metrics.record_request(
        method,
        path,
        status_code,
        duration,
        body.response_size.unwrap_or(0),
        body.user_agent,
        body.ip,
    );

    Ok(ApiResponse::message("Request metric recorded"))
}

// ─── POST /metrics/record/mongo ──────────────────────────────────

pub async fn record_db_operation(
    State(state): State<Arc<AppState>>,
    body: Result<Json<RecordDbOperationBody>, JsonRejection>,
) -> Recorded {
    let Json(body) = body.map_err(malformed)?;

    let (Some(operation), Some(collection), Some(duration), Some(success)) = (
        present(body.operation),
        present(body.collection),
        body.duration,
        body.success,
    ) else {
        return Err(AppError::Validation(
            "The fields operation, collection, duration and success are required".into(),
        ));
    };

    state
        .metrics
        .record_db_operation(operation, collection, duration, success, body.error);

    Ok(ApiResponse::message("Database metric recorded"))
}

// ─── POST /metrics/record/bandwidth ──────────────────────────────

pub async fn record_bandwidth(
    State(state): State<Arc<AppState>>,
    body: Result<Json<RecordBandwidthBody>, JsonRejection>,
) -> Recorded {
    let Json(body) = body.map_err(malformed)?;

    let (Some(bytes_in), Some(bytes_out), Some(requests_per_second)) =
        (body.bytes_in, body.bytes_out, body.requests_per_second)
    else {
        return Err(AppError::Validation(
            "The fields bytesIn, bytesOut and requestsPerSecond are required".into(),
        ));
    };

    state
        .metrics
        .record_bandwidth(bytes_in, bytes_out, requests_per_second);

    Ok(ApiResponse::message("Bandwidth metric recorded"))
}

// ─── Helpers ─────────────────────────────────────────────────────

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn malformed(rejection: JsonRejection) -> AppError {
    AppError::Validation(format!("Invalid request body: {}", rejection.body_text()))
}
