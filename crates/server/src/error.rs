// crates/server/src/error.rs
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use jobwatch_core::MonitorError;
use jobwatch_types::{JobHandle, ParseHandleError};
use serde::Serialize;
use thiserror::Error;

/// Structured JSON error response for API errors
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}

/// API error types that map to HTTP status codes
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Job not found: {0}")]
    JobNotFound(JobHandle),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl From<ParseHandleError> for ApiError {
    fn from(err: ParseHandleError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<MonitorError> for ApiError {
    fn from(err: MonitorError) -> Self {
        match err {
            MonitorError::JobNotFound { handle } => ApiError::JobNotFound(handle),
            err @ MonitorError::CursorOutOfRange { .. } => ApiError::BadRequest(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            ApiError::JobNotFound(handle) => {
                tracing::warn!(job = %handle, "Job not found");
                (
                    StatusCode::NOT_FOUND,
                    ErrorResponse::with_details("Job not found", format!("Job handle: {}", handle)),
                )
            }
            ApiError::BadRequest(msg) => {
                tracing::warn!(message = %msg, "Bad request");
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse::with_details("Bad request", msg.clone()),
                )
            }
        };

        (status, Json(error_response)).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
