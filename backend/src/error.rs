use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Errors raised by the swipe ledger, match engine and chat relay.
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The backing store failed. Nothing was partially written; retrying is safe.
    #[error("Storage unavailable: {0}")]
    Storage(#[from] anyhow::Error),
}

impl From<sqlx::Error> for MatchError {
    fn from(err: sqlx::Error) -> Self {
        MatchError::Storage(err.into())
    }
}

/// Central error type for the HTTP layer
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error(transparent)]
    Domain(#[from] MatchError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, code, retryable) = match self {
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg, "UNAUTHORIZED", false),
            AppError::Domain(MatchError::Validation(msg)) => {
                (StatusCode::BAD_REQUEST, msg, "BAD_REQUEST", false)
            }
            AppError::Domain(MatchError::Conflict(msg)) => {
                (StatusCode::CONFLICT, msg, "CONFLICT", false)
            }
            AppError::Domain(MatchError::NotFound(msg)) => {
                (StatusCode::NOT_FOUND, msg, "NOT_FOUND", false)
            }
            AppError::Domain(MatchError::Forbidden(msg)) => {
                (StatusCode::FORBIDDEN, msg, "FORBIDDEN", false)
            }
            AppError::Domain(MatchError::Storage(err)) => {
                tracing::error!("storage failure: {:#}", err);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Storage temporarily unavailable".to_string(),
                    "STORAGE_UNAVAILABLE",
                    true,
                )
            }
        };

        let body = Json(json!({
            "error": code,
            "message": message,
            "retryable": retryable,
        }));

        (status, body).into_response()
    }
}
