//! Error types for the sync engine.

use serde::Serialize;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during sync operations.
#[derive(Error, Debug, Clone)]
pub enum SyncError {
    /// No credential is configured; raised before any network call.
    #[error("no API credential configured")]
    MissingCredential,

    /// The request URL could not be built.
    #[error("could not build request URL for {path}: {message}")]
    UrlConstruction {
        /// Endpoint path that was being joined.
        path: String,
        /// Parser message.
        message: String,
    },

    /// Network or transport error.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// The remote answered with a non-success status.
    #[error("remote rejected request ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Sanitized message.
        message: String,
    },

    /// A response body could not be decoded.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The operation was cancelled.
    #[error("sync cancelled")]
    Cancelled,

    /// An internal invariant was violated.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SyncError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if this error can be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Transport { retryable, .. } => *retryable,
            SyncError::Api { status, .. } => is_retriable_status(*status),
            _ => false,
        }
    }

    /// Classifies the error for callers that relay it to a UI.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::MissingCredential => ErrorKind::MissingCredential,
            SyncError::UrlConstruction { .. } => ErrorKind::Validation,
            SyncError::Transport { .. } => ErrorKind::Network,
            SyncError::Api { status, .. } => ErrorKind::from_status(*status),
            SyncError::Protocol(_) | SyncError::Internal(_) => ErrorKind::Internal,
            SyncError::Cancelled => ErrorKind::Cancelled,
        }
    }
}

/// Returns true for statuses the remote uses for transient conditions.
pub fn is_retriable_status(status: u16) -> bool {
    status == 429 || status == 409 || status >= 500
}

/// Coarse error category carried in operation outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No credential configured.
    MissingCredential,
    /// Network failure after retries.
    Network,
    /// 429 after retries.
    RateLimited,
    /// 401 or 403.
    Unauthorized,
    /// 404.
    NotFound,
    /// Other 4xx, or a request that could not be built.
    Validation,
    /// 409 after retries.
    Conflict,
    /// 5xx after retries.
    Server,
    /// Cancelled by the caller.
    Cancelled,
    /// Decoding failure or broken invariant.
    Internal,
}

impl ErrorKind {
    /// Maps an HTTP status to a category.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => ErrorKind::Unauthorized,
            404 => ErrorKind::NotFound,
            409 => ErrorKind::Conflict,
            429 => ErrorKind::RateLimited,
            s if s >= 500 => ErrorKind::Server,
            _ => ErrorKind::Validation,
        }
    }
}
