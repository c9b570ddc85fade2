//! Error types for the reference server.

use pagesync_protocol::ApiErrorBody;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors the server answers with.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServerError {
    /// Malformed or oversized request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Missing or unknown bearer token.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Unknown page, block or route.
    #[error("not found: {0}")]
    NotFound(String),

    /// Write raced another write.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Too many requests.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),

    /// Scripted failure with an arbitrary status.
    #[error("{message}")]
    Injected {
        /// Status to answer with.
        status: u16,
        /// Message to answer with.
        message: String,
    },
}

impl ServerError {
    /// HTTP status for this error.
    pub fn status(&self) -> u16 {
        match self {
            ServerError::InvalidRequest(_) => 400,
            ServerError::Unauthorized(_) => 401,
            ServerError::NotFound(_) => 404,
            ServerError::Conflict(_) => 409,
            ServerError::RateLimited(_) => 429,
            ServerError::Internal(_) => 500,
            ServerError::Injected { status, .. } => *status,
        }
    }

    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self.status() {
            401 | 403 => "unauthorized",
            404 => "object_not_found",
            409 => "conflict_error",
            429 => "rate_limited",
            503 => "service_unavailable",
            s if s >= 500 => "internal_server_error",
            _ => "validation_error",
        }
    }

    /// Returns true if this is a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status())
    }

    /// Returns true if this is a server error (5xx).
    pub fn is_server_error(&self) -> bool {
        self.status() >= 500
    }

    /// Wire body for this error.
    pub fn to_body(&self) -> ApiErrorBody {
        ApiErrorBody::new(self.status(), self.code(), self.to_string())
    }
}
