//! Shared error definitions for toolkit primitives.

use thiserror::Error;

/// Result alias used throughout the toolkit.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while constructing primitive types.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// Type name failed validation.
    #[error("invalid type name `{name}`: {reason}")]
    InvalidTypeName {
        /// The offending name.
        name: String,
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// Session identifier failed validation.
    #[error("invalid session id: {reason}")]
    InvalidSessionId {
        /// Human-readable reason for rejection.
        reason: String,
    },
}
