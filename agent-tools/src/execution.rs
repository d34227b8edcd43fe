//! Execution modes and their static validation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ToolError;
use crate::method::ReturnType;

/// Scheduling annotations a tool method may declare.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionAnnotation {
    /// Run on the calling thread.
    Blocking,
    /// Never block the caller.
    NonBlocking,
    /// Run on a lightweight, cooperatively scheduled worker.
    RunOnVirtualThread,
}

/// How a dispatcher is scheduled relative to its caller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionMode {
    /// Occupies the calling task for the duration of the call.
    #[default]
    Blocking,
    /// Returns a future that completes asynchronously.
    NonBlocking,
    /// Runs on a spawned lightweight task.
    VirtualThread,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Blocking => "blocking",
            Self::NonBlocking => "non-blocking",
            Self::VirtualThread => "virtual-thread",
        })
    }
}

/// Computes the execution mode from declared annotations and the return type.
///
/// The first matching rule wins: explicit blocking, then explicit
/// non-blocking or an asynchronous return, then virtual thread.
#[must_use]
pub fn determine_execution_mode(
    annotations: &[ExecutionAnnotation],
    return_type: ReturnType,
) -> ExecutionMode {
    if annotations.contains(&ExecutionAnnotation::Blocking) {
        return ExecutionMode::Blocking;
    }
    if annotations.contains(&ExecutionAnnotation::NonBlocking) || return_type.is_async() {
        return ExecutionMode::NonBlocking;
    }
    if annotations.contains(&ExecutionAnnotation::RunOnVirtualThread) {
        return ExecutionMode::VirtualThread;
    }
    ExecutionMode::Blocking
}

/// Checks that the return type can be driven by the declared scheduling.
///
/// `method` is the qualified name used in error messages.
#[must_use]
pub fn validate_execution_model(
    method: &str,
    annotations: &[ExecutionAnnotation],
    return_type: ReturnType,
) -> Vec<ToolError> {
    let mut errors = Vec::new();

    if return_type == ReturnType::Stream {
        errors.push(ToolError::UnsupportedReturnType {
            method: method.to_owned(),
        });
    }

    if annotations.contains(&ExecutionAnnotation::RunOnVirtualThread)
        && return_type.is_future()
    {
        errors.push(ToolError::IncompatibleExecutionModel {
            method: method.to_owned(),
        });
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    use ExecutionAnnotation::{Blocking, NonBlocking, RunOnVirtualThread};

    #[test]
    fn defaults_to_blocking() {
        assert_eq!(
            determine_execution_mode(&[], ReturnType::Value),
            ExecutionMode::Blocking
        );
        assert_eq!(
            determine_execution_mode(&[], ReturnType::Unit),
            ExecutionMode::Blocking
        );
    }

    #[test]
    fn explicit_blocking_wins() {
        assert_eq!(
            determine_execution_mode(&[RunOnVirtualThread, Blocking], ReturnType::Future),
            ExecutionMode::Blocking
        );
    }

    #[test]
    fn async_returns_are_non_blocking() {
        assert_eq!(
            determine_execution_mode(&[], ReturnType::Future),
            ExecutionMode::NonBlocking
        );
        assert_eq!(
            determine_execution_mode(&[], ReturnType::Stream),
            ExecutionMode::NonBlocking
        );
        assert_eq!(
            determine_execution_mode(&[NonBlocking], ReturnType::Value),
            ExecutionMode::NonBlocking
        );
        assert_eq!(
            determine_execution_mode(&[RunOnVirtualThread, NonBlocking], ReturnType::Value),
            ExecutionMode::NonBlocking
        );
    }

    #[test]
    fn virtual_thread_annotation() {
        assert_eq!(
            determine_execution_mode(&[RunOnVirtualThread], ReturnType::Value),
            ExecutionMode::VirtualThread
        );
    }

    #[test]
    fn stream_is_always_unsupported() {
        for annotations in [
            &[][..],
            &[Blocking][..],
            &[NonBlocking][..],
            &[RunOnVirtualThread][..],
        ] {
            let errors = validate_execution_model("Feed.items", annotations, ReturnType::Stream);
            assert!(
                errors.iter().any(|err| matches!(
                    err,
                    ToolError::UnsupportedReturnType { method } if method == "Feed.items"
                )),
                "{annotations:?}"
            );
        }
    }

    #[test]
    fn virtual_thread_rejects_futures() {
        let errors =
            validate_execution_model("Mail.send", &[RunOnVirtualThread], ReturnType::Future);
        assert_eq!(
            errors,
            vec![ToolError::IncompatibleExecutionModel {
                method: "Mail.send".into()
            }]
        );

        assert!(validate_execution_model("Mail.send", &[RunOnVirtualThread], ReturnType::Value)
            .is_empty());
        assert!(validate_execution_model("Mail.send", &[], ReturnType::Future).is_empty());
    }
}
