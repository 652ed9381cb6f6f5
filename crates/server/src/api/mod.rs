//! HTTP handlers and the error envelope they share.

mod health;
mod jobs;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::warn;

use scaleout_core::PipelineError;

pub use health::health;
pub use jobs::submit_job;

#[derive(Serialize)]
pub struct FailedResponse {
    pub status: &'static str,
    pub detail: String,
}

/// A failed request: rendered as `{"status": "FAILED", "detail": ...}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            detail: detail.into(),
        }
    }
}

/// Caller mistakes map to 4xx, engine and storage failures to 5xx.
pub fn status_for(err: &PipelineError) -> StatusCode {
    match err {
        PipelineError::Validation(_) => StatusCode::BAD_REQUEST,
        PipelineError::NotFound(_) => StatusCode::NOT_FOUND,
        PipelineError::UnsupportedFormat(_) => StatusCode::UNPROCESSABLE_ENTITY,
        PipelineError::Storage(_) => StatusCode::BAD_GATEWAY,
        PipelineError::Engine(_) | PipelineError::Performance(_) | PipelineError::Io(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        Self {
            status: status_for(&err),
            detail: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            warn!(status = %self.status, detail = %self.detail, "request failed");
        }
        let body = FailedResponse {
            status: "FAILED",
            detail: self.detail,
        };
        (self.status, Json(body)).into_response()
    }
}
