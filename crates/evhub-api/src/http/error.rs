//! Application error type mapping to HTTP status codes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use evhub_types::error::HubError;

#[derive(Debug)]
pub enum AppError {
    /// The hub is shutting down and accepts no new work.
    Unavailable(String),
    /// Resource not found.
    NotFound(String),
}

impl From<HubError> for AppError {
    fn from(e: HubError) -> Self {
        match e {
            HubError::ShuttingDown => AppError::Unavailable(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, "SHUTTING_DOWN", msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
        };

        let body = json!({
            "error": {
                "code": code,
                "message": message,
            },
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        (status, axum::Json(body)).into_response()
    }
}
