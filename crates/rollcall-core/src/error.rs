//! # Error Module
//!
//! The single error type returned by every Rollcall operation.
//!
//! Variants are grouped by who is at fault: the caller (`InvalidInput`,
//! `Conflict`, `NotFound`), the caller's credentials (`Unauthorized`,
//! `Forbidden`), or the process itself (`Storage`, `Encoding`, `Crypto`).
//! The HTTP layer maps each group onto a status code.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PortalError>;

/// Errors produced by Rollcall services.
#[derive(Debug, Error)]
pub enum PortalError {
    /// A referenced record does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The operation conflicts with the current state (duplicate, wrong status).
    #[error("{0}")]
    Conflict(String),

    /// The request was well-formed but carried unacceptable values.
    #[error("{0}")]
    InvalidInput(String),

    /// Missing, invalid, expired or revoked credentials.
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated, but the role does not allow the operation.
    #[error("{message}")]
    Forbidden {
        message: String,
        required: Vec<crate::Role>,
        current: crate::Role,
    },

    /// The embedded database failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// A stored record could not be encoded or decoded.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// A hashing or signing primitive failed.
    #[error("Crypto error: {0}")]
    Crypto(String),
}

impl PortalError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    /// Short machine-readable name, used as the `error` field of API bodies.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "Not Found",
            Self::Conflict(_) => "Conflict",
            Self::InvalidInput(_) => "Bad Request",
            Self::Unauthorized(_) => "Unauthorized",
            Self::Forbidden { .. } => "Forbidden",
            Self::Storage(_) | Self::Encoding(_) | Self::Crypto(_) => "Internal Server Error",
        }
    }
}

// =============================================================================
// CONVERSIONS
// =============================================================================

macro_rules! storage_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for PortalError {
                fn from(err: $ty) -> Self {
                    Self::Storage(err.to_string())
                }
            }
        )*
    };
}

storage_from!(
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);

impl From<postcard::Error> for PortalError {
    fn from(err: postcard::Error) -> Self {
        Self::Encoding(err.to_string())
    }
}

impl From<csv::Error> for PortalError {
    fn from(err: csv::Error) -> Self {
        Self::Encoding(err.to_string())
    }
}

impl From<serde_json::Error> for PortalError {
    fn from(err: serde_json::Error) -> Self {
        Self::Encoding(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_groups_internal_failures() {
        assert_eq!(PortalError::Storage("x".into()).kind(), "Internal Server Error");
        assert_eq!(PortalError::Crypto("x".into()).kind(), "Internal Server Error");
        assert_eq!(PortalError::conflict("dup").kind(), "Conflict");
    }

    #[test]
    fn display_is_the_bare_message() {
        let err = PortalError::not_found("Leave request not found");
        assert_eq!(err.to_string(), "Leave request not found");
    }
}
