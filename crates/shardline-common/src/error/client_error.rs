//! Client error types
//!
//! Unified error handling for everything that surfaces to callers.

use shardline_core::{DomainError, Snowflake};
use std::time::Duration;

use crate::config::ConfigError;

/// Client-wide error type
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    // Connection errors
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    // Lookup errors
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: Snowflake },

    // Rate limiting
    #[error("Rate limit wait of {wait:?} exceeds the configured maximum of {max:?}")]
    RatelimitTooLong { wait: Duration, max: Duration },

    // Remote errors
    #[error("Request rejected with status {status}: {message}")]
    RemoteRejection { status: u16, message: String },

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    // Payload errors
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Shutting down")]
    ShuttingDown,
}

/// Result type alias for client operations
pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    /// Shorthand for a cache/remote miss
    pub fn not_found(kind: &'static str, id: Snowflake) -> Self {
        Self::NotFound { kind, id }
    }

    /// Get error code for logs
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Transport(_) => "TRANSPORT_ERROR",
            Self::Protocol(_) => "PROTOCOL_ERROR",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::RatelimitTooLong { .. } => "RATELIMIT_TOO_LONG",
            Self::RemoteRejection { .. } => "REMOTE_REJECTION",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Domain(e) => e.code(),
            Self::ShuttingDown => "SHUTTING_DOWN",
        }
    }

    /// Connection-level failures the shard recovers from by reconnecting
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Check if this is a "not found" error, locally or remotely
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::RemoteRejection { status, .. } => *status == 404,
            Self::Domain(e) => e.is_not_found(),
            _ => false,
        }
    }

    /// Status code for remote rejections
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RemoteRejection { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Domain(DomainError::from(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        assert!(ClientError::not_found("guild", Snowflake::new(1)).is_not_found());
        assert!(ClientError::RemoteRejection {
            status: 404,
            message: "Unknown Channel".to_string()
        }
        .is_not_found());
        assert!(!ClientError::Transport("reset".to_string()).is_not_found());
    }

    #[test]
    fn test_error_codes() {
        let err = ClientError::RatelimitTooLong {
            wait: Duration::from_secs(10),
            max: Duration::from_secs(1),
        };
        assert_eq!(err.error_code(), "RATELIMIT_TOO_LONG");
        assert!(!err.is_recoverable());
        assert!(ClientError::Transport("eof".to_string()).is_recoverable());
    }

    #[test]
    fn test_display() {
        let err = ClientError::not_found("channel", Snowflake::new(42));
        assert_eq!(err.to_string(), "channel not found: 42");

        let err = ClientError::RemoteRejection {
            status: 403,
            message: "Missing Access".to_string(),
        };
        assert_eq!(err.status(), Some(403));
        assert_eq!(err.to_string(), "Request rejected with status 403: Missing Access");
    }

    #[test]
    fn test_from_json_error() {
        let err: ClientError = serde_json::from_str::<u8>("x").unwrap_err().into();
        assert_eq!(err.error_code(), "INVALID_DOCUMENT");
    }
}
