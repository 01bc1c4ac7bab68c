//! API error types and responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use ringtone_core::RewardsError;

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Unauthorized - missing or invalid credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// Forbidden - valid credentials but not allowed to act on the target.
    #[error("forbidden")]
    Forbidden,

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Bad request - malformed input.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Request understood but rejected by a business rule.
    #[error("{0}")]
    Validation(String),

    /// Conflict - concurrent modification or invalid state transition.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A mutation succeeded but a follow-up write failed.
    #[error("{0}")]
    PartialFailure(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    success: bool,
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", self.to_string()),
            Self::Forbidden => (StatusCode::FORBIDDEN, "forbidden", self.to_string()),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            Self::Validation(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_failed",
                msg.clone(),
            ),
            Self::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone()),
            Self::PartialFailure(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "partial_failure",
                msg.clone(),
            ),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorResponse {
            success: false,
            error: ErrorBody { code, message },
        };

        (status, Json(body)).into_response()
    }
}

impl From<RewardsError> for ApiError {
    fn from(err: RewardsError) -> Self {
        match err {
            RewardsError::NotFound { .. } => Self::NotFound(err.to_string()),
            RewardsError::ValidationFailed(msg) => Self::Validation(msg),
            RewardsError::Unauthorized => Self::Forbidden,
            RewardsError::PartialFailure { message, .. } => Self::PartialFailure(message),
            RewardsError::Contention | RewardsError::InvalidTransition { .. } => {
                Self::Conflict(err.to_string())
            }
            RewardsError::InvalidId(e) => Self::BadRequest(e.to_string()),
            RewardsError::Storage(msg) => Self::Internal(msg),
        }
    }
}
