//! Error types for api-client

use serde_json::Value;
use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ApiError>;

/// A failed API call.
///
/// `status` is the HTTP status code, or 0 when no response was received.
/// Cloneable so one outcome can be handed to every caller of a shared request.
#[derive(Debug, Clone, Error)]
#[error("API error {status}: {message}")]
pub struct ApiError {
    pub status: u16,
    pub message: String,
    /// Parsed response body, when the server sent JSON.
    pub body: Option<Value>,
}

impl ApiError {
    pub fn new(status: u16, message: impl Into<String>, body: Option<Value>) -> Self {
        Self {
            status,
            message: message.into(),
            body,
        }
    }

    /// Connection, timeout or request-building failure.
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::new(0, format!("Request failed: {}", err), None)
    }

    /// Response body that does not match the expected shape.
    pub fn decode(err: impl std::fmt::Display) -> Self {
        Self::new(0, format!("Invalid response body: {}", err), None)
    }

    pub fn is_transport(&self) -> bool {
        self.status == 0
    }

    pub fn is_rate_limited(&self) -> bool {
        self.status == 429
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }
}
