//! Error types for hifz-sched
//!
//! `ApiError` is the HTTP-facing taxonomy: validation 400, authentication
//! 401, fluency-gate preconditions 403, lookups 404, conflicts and protocol
//! violations 409, everything unexpected 500. Bodies carry a machine code
//! plus message; the correlation middleware injects the request id.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::models::StepType;
use crate::scheduler::protocol::StepProgress;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or schema-violating input (400)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing or invalid bearer credentials (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Fluency gate still blocks this user (403)
    #[error("Fluency gate required: {0}")]
    GateBlocked(String),

    /// Resource lookup missed (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// State conflict, e.g. session no longer active (409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Step submission out of protocol order (409)
    #[error("Invalid step sequence")]
    InvalidStepSequence {
        expected_step: Option<StepType>,
        expected_attempt: Option<i64>,
        protocol: Vec<StepProgress>,
    },

    /// Database errors (500)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Shared-infrastructure errors
    #[error("{0}")]
    Common(#[from] hifz_common::Error),

    /// Unexpected internal error (500)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, detail) = match self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg, None),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg, None),
            ApiError::GateBlocked(msg) => {
                (StatusCode::FORBIDDEN, "FLUENCY_GATE_REQUIRED", msg, None)
            }
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg, None),
            ApiError::InvalidStepSequence {
                expected_step,
                expected_attempt,
                protocol,
            } => (
                StatusCode::CONFLICT,
                "INVALID_STEP_SEQUENCE",
                "submitted step does not match the expected protocol position".to_string(),
                Some(json!({
                    "expected_step": expected_step,
                    "expected_attempt": expected_attempt,
                    "protocol": protocol,
                })),
            ),
            ApiError::Database(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                err.to_string(),
                None,
            ),
            ApiError::Common(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                err.to_string(),
                None,
            ),
            ApiError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg, None)
            }
        };

        let mut error = json!({
            "code": error_code,
            "message": message,
        });
        if let (Some(object), Some(detail)) =
            (error.as_object_mut(), detail.as_ref().and_then(|d| d.as_object()))
        {
            for (key, value) in detail {
                object.insert(key.clone(), value.clone());
            }
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
