pub mod query;
pub mod record;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

// ─── Shared response envelope ────────────────────────────────────

/// Every API response is `{success, data?, message?}`.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn data(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            message: None,
        })
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            data: None,
            message: Some(message.into()),
        })
    }

    fn failure(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: false,
            data: None,
            message: Some(message.into()),
        })
    }
}

// ─── Unified error type ──────────────────────────────────────────

pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or malformed input; the message is shown to the caller.
    #[error("{0}")]
    Validation(String),

    #[error("missing or invalid bearer token")]
    Unauthorized,

    /// Unexpected fault; the detail is logged, never returned.
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, AppError::Unauthorized.to_string()),
            Self::Internal(detail) => {
                tracing::error!(%detail, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_MESSAGE.into())
            }
        };

        (status, ApiResponse::failure(message)).into_response()
    }
}
