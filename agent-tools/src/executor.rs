//! Runs model-issued tool calls against a published registry.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use agent_primitives::{SessionId, TypeName};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::arguments::ArgumentMapper;
use crate::dispatch::{DispatchError, Receiver};
use crate::registry::ToolRegistry;

/// Result alias for executor operations.
pub type ExecutorResult<T> = Result<T, ExecutorError>;

/// Tool call as emitted by a chat model.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolExecutionRequest {
    /// Provider-assigned call identifier, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Name of the tool to run.
    pub name: String,
    /// Arguments as JSON object text.
    #[serde(default)]
    pub arguments: String,
}

impl ToolExecutionRequest {
    /// Creates a request without an identifier.
    #[must_use]
    pub fn new(name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            arguments: arguments.into(),
        }
    }

    /// Sets the provider-assigned identifier.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Errors raised while executing a tool call.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// The registry has no tool with the requested name.
    #[error("unknown tool `{name}`")]
    UnknownTool {
        /// Requested tool name.
        name: String,
    },

    /// No instance of the owning type is available.
    #[error("no receiver registered for `{owner}`")]
    NoReceiver {
        /// Owning type of the tool.
        owner: TypeName,
    },

    /// Argument mapping or the call itself failed.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Supplies the instance a tool method is invoked on.
pub trait ReceiverResolver: Send + Sync {
    /// Returns the live instance of `owner`, if one exists.
    fn resolve(&self, owner: &TypeName) -> Option<Receiver>;
}

/// Map-backed [`ReceiverResolver`].
#[derive(Clone, Default)]
pub struct Receivers {
    instances: HashMap<TypeName, Receiver>,
}

impl fmt::Debug for Receivers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.instances.keys()).finish()
    }
}

impl Receivers {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an instance under its Rust type name.
    pub fn insert<T>(&mut self, instance: Arc<T>) -> &mut Self
    where
        T: Any + Send + Sync,
    {
        self.instances.insert(TypeName::of::<T>(), instance);
        self
    }

    /// Registers an instance under an explicit owner name.
    pub fn insert_named(&mut self, owner: TypeName, instance: Receiver) -> &mut Self {
        self.instances.insert(owner, instance);
        self
    }

    /// Builder-style variant of [`Receivers::insert`].
    #[must_use]
    pub fn with<T>(mut self, instance: Arc<T>) -> Self
    where
        T: Any + Send + Sync,
    {
        self.insert(instance);
        self
    }
}

impl ReceiverResolver for Receivers {
    fn resolve(&self, owner: &TypeName) -> Option<Receiver> {
        self.instances.get(owner).cloned()
    }
}

/// Resolves, maps, and dispatches tool calls.
#[derive(Clone, Debug)]
pub struct ToolExecutor<R = Receivers> {
    registry: ToolRegistry,
    receivers: R,
}

impl<R: ReceiverResolver> ToolExecutor<R> {
    /// Creates an executor over a published registry.
    #[must_use]
    pub const fn new(registry: ToolRegistry, receivers: R) -> Self {
        Self {
            registry,
            receivers,
        }
    }

    /// Returns the registry calls are resolved against.
    #[must_use]
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Runs one tool call and renders its result as text.
    ///
    /// String results are returned verbatim; any other value is serialized
    /// as JSON.
    ///
    /// # Errors
    ///
    /// * [`ExecutorError::UnknownTool`] when no tool has the requested name.
    /// * [`ExecutorError::NoReceiver`] when the owner has no live instance.
    /// * [`ExecutorError::Dispatch`] when the arguments are invalid or the
    ///   tool fails.
    pub async fn execute(
        &self,
        request: &ToolExecutionRequest,
        session: Option<&SessionId>,
    ) -> ExecutorResult<String> {
        let (owner, entry) =
            self.registry
                .find(&request.name)
                .ok_or_else(|| ExecutorError::UnknownTool {
                    name: request.name.clone(),
                })?;
        let receiver = self
            .receivers
            .resolve(owner)
            .ok_or_else(|| ExecutorError::NoReceiver {
                owner: owner.clone(),
            })?;

        let args = ArgumentMapper::new(entry.descriptor(), entry.metadata())
            .parse_positional(&request.arguments, session)?;
        debug!(
            tool = %request.name,
            id = request.id.as_deref().unwrap_or_default(),
            "executing tool call"
        );

        let value = entry.dispatcher().execute(receiver, args).await?;
        Ok(render(value))
    }
}

fn render(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}
