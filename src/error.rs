use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::storage::StorageError;

/// Error taxonomy for every operation. Each variant maps to one HTTP status
/// and the uniform `{ "success": false, "message": ... }` failure envelope.
#[derive(Debug)]
pub enum ApiError {
    /// Malformed identifier or field (400)
    Validation(String),
    /// Referenced entity absent (404)
    NotFound(String),
    /// Authorization denied (401; missing, invalid or insufficient credentials)
    Forbidden(String),
    /// Per-user booking ceiling reached (400)
    Quota(String),
    /// Storage or infra failure (500); detail is logged, caller gets a generic message
    Unexpected(String),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Validation(msg) => write!(f, "validation: {msg}"),
            ApiError::NotFound(msg) => write!(f, "not found: {msg}"),
            ApiError::Forbidden(msg) => write!(f, "forbidden: {msg}"),
            ApiError::Quota(msg) => write!(f, "quota exceeded: {msg}"),
            ApiError::Unexpected(msg) => write!(f, "unexpected: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        ApiError::Unexpected(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Forbidden(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Quota(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unexpected(msg) => {
                // Full detail server-side only; the caller sees a generic message.
                tracing::error!("unexpected error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(json!({ "success": false, "message": message }))).into_response()
    }
}
