//! Unified error types for the todo service.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::api::Envelope;

/// Unified error type for the todo service and its tooling.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Configuration loaded but failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Health check failed.
    #[error(transparent)]
    HealthCheck(#[from] HealthCheckError),

    /// Database connection error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Socket bind or serve error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Process exit code. Health check failures keep their own codes.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::HealthCheck(e) => e.exit_code(),
            _ => 1,
        }
    }
}

/// Errors surfaced by the todo routes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TodoError {
    /// Name missing or whitespace only.
    #[error("Todo name must not be empty")]
    BlankName,

    /// No todo with the requested id.
    #[error("Todo not found")]
    NotFound {
        /// The id as it appeared in the request path.
        id: String,
    },

    /// Request body could not be decoded.
    #[error("Invalid request body: {0}")]
    InvalidBody(String),
}

impl TodoError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            TodoError::BlankName | TodoError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            TodoError::NotFound { .. } => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for TodoError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let TodoError::NotFound { id } = &self {
            tracing::debug!(id = %id, "todo not found");
        }
        (status, Json(Envelope::<()>::failure(self.to_string()))).into_response()
    }
}

/// Health check failures. Each maps to its own process exit code.
#[derive(Error, Debug)]
pub enum HealthCheckError {
    /// The service answered but reported itself unhealthy.
    #[error("service unhealthy: {message}")]
    Unhealthy {
        /// Message from the health payload, if any.
        message: String,
    },

    /// Response body was not a health payload.
    #[error("failed to parse health response: {0}")]
    Parse(#[source] serde_json::Error),

    /// No response within the timeout.
    #[error("health check timed out")]
    Timeout,

    /// Connection refused or another transport failure.
    #[error("health check request failed: {0}")]
    Request(#[source] reqwest::Error),
}

impl HealthCheckError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            HealthCheckError::Unhealthy { .. } => 1,
            HealthCheckError::Parse(_) => 2,
            HealthCheckError::Timeout => 3,
            HealthCheckError::Request(_) => 4,
        }
    }
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn todo_errors_map_to_status_codes() {
        assert_eq!(TodoError::BlankName.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            TodoError::NotFound { id: "9".into() }.status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            TodoError::InvalidBody("eof".into()).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn health_check_exit_codes_are_distinct() {
        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let request = reqwest::Client::new().get("not a url").build().unwrap_err();
        let codes = [
            HealthCheckError::Unhealthy { message: String::new() }.exit_code(),
            HealthCheckError::Parse(parse).exit_code(),
            HealthCheckError::Timeout.exit_code(),
            HealthCheckError::Request(request).exit_code(),
        ];

        assert_eq!(codes, [1, 2, 3, 4]);
        let unique: std::collections::HashSet<_> = codes.iter().collect();
        assert_eq!(unique.len(), codes.len());
    }

    #[test]
    fn app_error_keeps_health_check_exit_code() {
        let err: AppError = HealthCheckError::Timeout.into();
        assert!(matches!(err, AppError::HealthCheck(HealthCheckError::Timeout)));
        assert_eq!(err.exit_code(), 3);
        assert_eq!(err.to_string(), "health check timed out");

        let err = AppError::InvalidConfig("PORT".into());
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn io_and_database_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::AddrInUse, "taken");
        let err: AppError = io.into();
        assert!(matches!(err, AppError::Io(_)));
        assert!(err.to_string().contains("taken"));

        let err: AppError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, AppError::Database(_)));
        assert_eq!(err.exit_code(), 1);
    }
}
