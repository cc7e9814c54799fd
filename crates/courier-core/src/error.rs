//! Error types for Courier.
//!
//! Every failure a caller can observe at the client boundary is a variant of
//! [`CourierError`]. Server-produced failures travel inside the response
//! envelope and are surfaced on the client as [`CourierError::Remote`].

use std::time::Duration;
use thiserror::Error;

/// Main error type for Courier.
#[derive(Debug, Error)]
pub enum CourierError {
    // Routing errors
    #[error("{version}.{service} not found")]
    ServiceNotFound { version: String, service: String },

    #[error("null returned")]
    NullReturned,

    #[error("Invalid target: {message}")]
    InvalidTarget { message: String },

    // Serialization errors
    #[error("Failed to decode {type_name}: {message}")]
    Decode {
        type_name: &'static str,
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Failure reported by the remote side in the response header
    #[error("{message}")]
    Remote { message: String },

    // Transport errors
    #[error("Request timeout after {0:?}")]
    Timeout(Duration),

    #[error("Network error: {message}")]
    Network {
        message: String,
        /// Optional cause description
        cause: Option<String>,
    },

    #[error("Server responded with HTTP {status}")]
    HttpStatus { status: u16 },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("{0}")]
    Internal(String),
}

/// Result type alias for Courier operations.
pub type Result<T> = std::result::Result<T, CourierError>;

impl From<serde_json::Error> for CourierError {
    fn from(err: serde_json::Error) -> Self {
        CourierError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl CourierError {
    /// Build a decode error for the named target type.
    pub fn decode<T>(err: serde_json::Error) -> Self {
        CourierError::Decode {
            type_name: std::any::type_name::<T>(),
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// HTTP status the server uses when this error ends a request.
    ///
    /// Dispatch-level outcomes (not found, null returned) are reported in the
    /// envelope header with a 200, like a successful call.
    pub fn status_code(&self) -> u16 {
        match self {
            CourierError::ServiceNotFound { .. } | CourierError::NullReturned => 200,
            CourierError::Decode { .. } | CourierError::InvalidTarget { .. } => 400,
            CourierError::Timeout(_) => 503,
            _ => 500,
        }
    }

    /// Check if this error is a transport failure the caller may retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CourierError::Network { .. } | CourierError::Timeout(_)
        )
    }
}
