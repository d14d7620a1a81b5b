//! Error types: HTTP-facing `AppError` and the per-connection `EventError` taxonomy.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level errors surfaced over HTTP.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Redis(e) => (
                StatusCode::SERVICE_UNAVAILABLE,
                format!("Redis error: {}", e),
            ),
            AppError::Db(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {}", e),
            ),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Auth(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            AppError::Internal(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Internal error: {}", e),
            ),
        };

        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

/// Failure of a single real-time action. Always scoped to the connection that issued it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventError {
    #[error("Authentication failed")]
    AuthenticationFailed,

    #[error("You are not a member of this room")]
    NotAMember,

    #[error("{0}")]
    ValidationFailed(String),

    #[error("Failed to save message")]
    PersistenceFailed,

    #[error("Internal server error")]
    InternalFailure,
}

impl EventError {
    /// Stable machine-readable code sent in the `error` event.
    pub fn code(&self) -> &'static str {
        match self {
            EventError::AuthenticationFailed => "authentication_failed",
            EventError::NotAMember => "not_a_member",
            EventError::ValidationFailed(_) => "validation_failed",
            EventError::PersistenceFailed => "persistence_failed",
            EventError::InternalFailure => "internal_failure",
        }
    }
}

impl From<EventError> for AppError {
    fn from(err: EventError) -> Self {
        match err {
            EventError::AuthenticationFailed => AppError::Auth(err.to_string()),
            EventError::NotAMember => AppError::Forbidden(err.to_string()),
            EventError::ValidationFailed(msg) => AppError::Validation(msg),
            other => AppError::Internal(anyhow::anyhow!(other)),
        }
    }
}
