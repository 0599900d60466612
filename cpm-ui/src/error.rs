//! HTTP error responses
//!
//! Every error renders as `{"error": {"code", "message"}}`. Locked content
//! additionally carries the tier that would unlock it.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use cpm_common::Tier;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// No signed-in session for the caller (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Caller lacks the required role (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Content above the caller's tier (403, `TIER_REQUIRED`)
    #[error("Requires the {required} tier")]
    TierRequired { required: Tier },

    /// Conflict (409), e.g. an e-mail already in use
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// cpm-common error
    #[error(transparent)]
    Common(#[from] cpm_common::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        use cpm_common::Error as CommonError;

        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg),
            ApiError::TierRequired { required } => {
                let body = Json(json!({
                    "error": {
                        "code": "TIER_REQUIRED",
                        "message": format!("Requires the {} tier", required),
                        "requiredTier": required,
                    }
                }));
                return (StatusCode::FORBIDDEN, body).into_response();
            }
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            ApiError::Common(err) => match err {
                CommonError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
                CommonError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
                CommonError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg),
                other => {
                    tracing::error!("Request failed: {}", other);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        other.to_string(),
                    )
                }
            },
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
