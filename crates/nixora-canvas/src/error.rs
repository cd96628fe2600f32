//! Error types for nixora-canvas
//!
//! This module provides error types for the canvas system,
//! including transport, storage, and session errors. The host/preview
//! reconcilers themselves never fail; these errors belong to the edges.

use thiserror::Error;
use uuid::Uuid;

/// Canvas error type
#[derive(Debug, Error)]
pub enum Error {
    /// Preview session not found
    #[error("session not found: {0}")]
    SessionNotFound(Uuid),

    /// Document not found (or not owned by the caller)
    #[error("document not found: {0}")]
    DocumentNotFound(Uuid),

    /// WebSocket error
    #[error("websocket error: {0}")]
    WebSocket(String),

    /// Invalid message format
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// Inbound frame exceeds the configured limit
    #[error("message too large: {0} bytes")]
    MessageTooLarge(usize),

    /// Origin rejected by the preview origin policy
    #[error("origin not allowed: {0}")]
    OriginRejected(String),

    /// Database error
    #[error("database error: {0}")]
    Database(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Permission denied
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Maximum sessions exceeded
    #[error("maximum sessions exceeded for user: {0}")]
    MaxSessionsExceeded(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a WebSocket error
    #[must_use]
    pub fn websocket(msg: impl Into<String>) -> Self {
        Self::WebSocket(msg.into())
    }

    /// Create a database error
    #[must_use]
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create a serialization error
    #[must_use]
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Create an invalid message error
    #[must_use]
    pub fn invalid_message(msg: impl Into<String>) -> Self {
        Self::InvalidMessage(msg.into())
    }

    /// Check if error is recoverable
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::WebSocket(_) | Self::Database(_))
    }

    /// Get error code for API responses
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::SessionNotFound(_) => "session_not_found",
            Self::DocumentNotFound(_) => "document_not_found",
            Self::WebSocket(_) => "websocket_error",
            Self::InvalidMessage(_) => "invalid_message",
            Self::MessageTooLarge(_) => "message_too_large",
            Self::OriginRejected(_) => "origin_rejected",
            Self::Database(_) => "database_error",
            Self::Serialization(_) => "serialization_error",
            Self::PermissionDenied(_) => "permission_denied",
            Self::MaxSessionsExceeded(_) => "max_sessions_exceeded",
            Self::Internal(_) => "internal_error",
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<axum::Error> for Error {
    fn from(err: axum::Error) -> Self {
        Self::WebSocket(err.to_string())
    }
}

/// Result type alias for canvas operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = Error::SessionNotFound(Uuid::nil());
        assert_eq!(err.code(), "session_not_found");

        let err = Error::OriginRejected("https://evil.test".into());
        assert_eq!(err.code(), "origin_rejected");
    }

    #[test]
    fn test_error_is_recoverable() {
        assert!(Error::websocket("reset").is_recoverable());
        assert!(Error::database("locked").is_recoverable());
        assert!(!Error::DocumentNotFound(Uuid::nil()).is_recoverable());
    }

    #[test]
    fn test_error_constructors() {
        let err = Error::websocket("connection failed");
        assert_eq!(err.code(), "websocket_error");

        let err = Error::serialization("bad json");
        assert_eq!(err.code(), "serialization_error");
    }

    #[test]
    fn test_error_display() {
        let err = Error::MessageTooLarge(2048);
        assert_eq!(err.to_string(), "message too large: 2048 bytes");
    }

    #[test]
    fn test_from_serde_error() {
        let result: std::result::Result<i32, serde_json::Error> =
            serde_json::from_str("not valid json");
        let err: Error = result.unwrap_err().into();
        assert_eq!(err.code(), "serialization_error");
    }
}
