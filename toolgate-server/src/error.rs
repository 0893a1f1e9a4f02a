//! Error types for the toolgate server.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use toolgate_core::{ExecutionError, GateError};

/// Errors that can occur when building a router.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// A route prefix must start with `/`.
    #[error("Invalid route prefix '{0}': must start with '/'")]
    InvalidPrefix(String),

    /// A zero request timeout would fail every call.
    #[error("Request timeout must be greater than zero")]
    ZeroTimeout,
}

/// Errors that can occur while serving a request.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The gate rejected the call or the executor failed.
    #[error(transparent)]
    Gate(#[from] GateError),

    /// Invalid request from client.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::Gate(GateError::Unauthenticated(_)) => StatusCode::UNAUTHORIZED,
            ServerError::Gate(GateError::Denied { .. }) => StatusCode::FORBIDDEN,
            ServerError::Gate(GateError::Execution(ExecutionError::Failed(_))) => {
                StatusCode::BAD_GATEWAY
            }
            ServerError::Gate(GateError::Execution(ExecutionError::TimedOut(_))) => {
                StatusCode::GATEWAY_TIMEOUT
            }
            ServerError::Gate(GateError::Execution(ExecutionError::Cancelled)) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        // GateError's Display is already caller-safe
        let body = Json(serde_json::json!({
            "error": self.to_string(),
            "code": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

/// Result type alias for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
