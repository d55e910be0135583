//! Domain errors - failures while interpreting documents and entities

use thiserror::Error;

use crate::value_objects::{Snowflake, SnowflakeParseError};

/// Domain layer errors
#[derive(Debug, Error)]
pub enum DomainError {
    // =========================================================================
    // Document Errors
    // =========================================================================
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Invalid document: {0}")]
    InvalidDocument(#[from] serde_json::Error),

    #[error("Invalid snowflake: {0}")]
    InvalidSnowflake(#[from] SnowflakeParseError),

    // =========================================================================
    // Lookup Errors
    // =========================================================================
    #[error("Member not found in guild {guild_id}: {user_id}")]
    MemberNotFound {
        guild_id: Snowflake,
        user_id: Snowflake,
    },

    #[error("Role not found: {0}")]
    RoleNotFound(Snowflake),
}

impl DomainError {
    /// Get an error code string for logs
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingField(_) => "MISSING_FIELD",
            Self::InvalidDocument(_) => "INVALID_DOCUMENT",
            Self::InvalidSnowflake(_) => "INVALID_SNOWFLAKE",
            Self::MemberNotFound { .. } => "UNKNOWN_MEMBER",
            Self::RoleNotFound(_) => "UNKNOWN_ROLE",
        }
    }

    /// Check if this error came from a malformed payload
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Self::MissingField(_) | Self::InvalidDocument(_) | Self::InvalidSnowflake(_)
        )
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::MemberNotFound { .. } | Self::RoleNotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(DomainError::MissingField("id").code(), "MISSING_FIELD");
        assert_eq!(DomainError::RoleNotFound(Snowflake::new(1)).code(), "UNKNOWN_ROLE");
    }

    #[test]
    fn test_classification() {
        let json_err = serde_json::from_str::<u8>("x").unwrap_err();
        assert!(DomainError::from(json_err).is_malformed());
        assert!(DomainError::RoleNotFound(Snowflake::new(1)).is_not_found());
        assert!(!DomainError::MissingField("id").is_not_found());
    }

    #[test]
    fn test_error_display() {
        let err = DomainError::MemberNotFound {
            guild_id: Snowflake::new(10),
            user_id: Snowflake::new(20),
        };
        assert_eq!(err.to_string(), "Member not found in guild 10: 20");
    }
}
