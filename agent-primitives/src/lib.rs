//! Core shared types for the agent toolkit.

#![warn(missing_docs, clippy::pedantic)]

mod error;
mod ids;
mod type_name;

/// Error type and result alias shared across the toolkit.
pub use error::{Error, Result};
/// Conversation identity carried into session-aware tools.
pub use ids::SessionId;
/// Qualified name of a type that owns tool methods.
pub use type_name::TypeName;
