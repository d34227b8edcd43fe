//! Errors collected while building tool descriptors and the registry.

use agent_primitives::TypeName;
use thiserror::Error;

/// Result alias for tool definition operations.
pub type ToolResult<T> = Result<T, ToolError>;

/// Errors produced while turning declared tool methods into registry entries.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ToolError {
    /// Two tools resolved to the same name.
    #[error(
        "a tool with the name `{name}` from `{owner}` is already declared in \
         `{existing_owner}`; tool names must be unique"
    )]
    DuplicateToolName {
        /// The colliding tool name.
        name: String,
        /// Owner of the rejected declaration.
        owner: TypeName,
        /// Owner of the retained declaration.
        existing_owner: TypeName,
    },

    /// The declaring type cannot host a tool.
    #[error("tool `{owner}#{method}` is ignored: {reason}")]
    IllegalToolDefinition {
        /// Owner of the offending method.
        owner: TypeName,
        /// Name of the offending method.
        method: String,
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// The tool returns a multi-valued asynchronous stream.
    #[error("method `{method}` returns a stream, which is not supported for tools")]
    UnsupportedReturnType {
        /// Qualified method name (`Owner.method`).
        method: String,
    },

    /// The declared execution mode cannot drive the return type.
    #[error(
        "method `{method}` returns a future, which is not supported with virtual-thread execution"
    )]
    IncompatibleExecutionModel {
        /// Qualified method name (`Owner.method`).
        method: String,
    },

    /// Descriptor construction failed validation.
    #[error("invalid tool descriptor: {reason}")]
    InvalidDescriptor {
        /// Human-readable reason for rejection.
        reason: String,
    },
}

impl ToolError {
    /// Creates an invalid descriptor error from the supplied reason.
    #[must_use]
    pub fn invalid_descriptor(reason: impl Into<String>) -> Self {
        Self::InvalidDescriptor {
            reason: reason.into(),
        }
    }

    /// Returns `true` when the error prevents the registry from being
    /// published at all.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::DuplicateToolName { .. })
    }
}

/// Raised when discovery collected errors that block publication.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("tool registry cannot be published: {}", summarize(.errors))]
pub struct PublishError {
    /// The fatal errors, in discovery order.
    pub errors: Vec<ToolError>,
}

fn summarize(errors: &[ToolError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
