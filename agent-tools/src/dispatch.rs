//! Runtime adapters that invoke tool methods.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value;
use thiserror::Error;
use tracing::{Instrument, debug, info_span};

use crate::execution::ExecutionMode;

/// Literal returned in place of a void result.
pub const SUCCESS: &str = "Success";

/// Live instance a tool method is invoked on.
pub type Receiver = Arc<dyn Any + Send + Sync>;

/// Future produced by non-blocking tool methods.
pub type ToolFuture = BoxFuture<'static, anyhow::Result<Value>>;

/// Result alias for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;

/// What a target produced for a single call.
pub enum ToolOutput {
    /// Value available immediately.
    Ready(Value),
    /// Value that completes asynchronously.
    Pending(ToolFuture),
}

impl ToolOutput {
    /// Wraps an immediately available value.
    #[must_use]
    pub const fn ready(value: Value) -> Self {
        Self::Ready(value)
    }

    /// Wraps a future producing the value.
    pub fn pending<F>(future: F) -> Self
    where
        F: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        Self::Pending(Box::pin(future))
    }

    /// Returns the value when it is already available.
    #[must_use]
    pub fn into_ready(self) -> Option<Value> {
        match self {
            Self::Ready(value) => Some(value),
            Self::Pending(_) => None,
        }
    }

    /// Waits for the value.
    ///
    /// # Errors
    ///
    /// Propagates the error produced by a pending future.
    pub async fn resolve(self) -> anyhow::Result<Value> {
        match self {
            Self::Ready(value) => Ok(value),
            Self::Pending(future) => future.await,
        }
    }
}

impl fmt::Debug for ToolOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(value) => f.debug_tuple("Ready").field(value).finish(),
            Self::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}

/// Callable that runs a tool method against a receiver.
///
/// `args` has one slot per declared parameter, in declaration order.
pub trait ToolTarget: Send + Sync {
    /// Calls the method.
    ///
    /// # Errors
    ///
    /// Returns whatever error the method (or argument decoding) raised.
    fn call(&self, receiver: Receiver, args: Vec<Value>) -> anyhow::Result<ToolOutput>;
}

impl<F> ToolTarget for F
where
    F: Fn(Receiver, Vec<Value>) -> anyhow::Result<ToolOutput> + Send + Sync,
{
    fn call(&self, receiver: Receiver, args: Vec<Value>) -> anyhow::Result<ToolOutput> {
        (self)(receiver, args)
    }
}

/// Pins the closure signature expected by [`ToolTarget`].
pub fn tool_target<F>(f: F) -> F
where
    F: Fn(Receiver, Vec<Value>) -> anyhow::Result<ToolOutput> + Send + Sync + 'static,
{
    f
}

/// Raised by targets handed a receiver of the wrong type.
#[derive(Debug, Error)]
#[error("receiver is not an instance of `{expected}`")]
pub struct ReceiverMismatch {
    /// Type the target expected.
    pub expected: &'static str,
}

/// Downcasts a receiver to the concrete type a target was generated for.
///
/// # Errors
///
/// Returns [`ReceiverMismatch`] when the receiver holds another type.
pub fn downcast_receiver<T>(receiver: Receiver) -> Result<Arc<T>, ReceiverMismatch>
where
    T: Any + Send + Sync,
{
    receiver.downcast::<T>().map_err(|_| ReceiverMismatch {
        expected: std::any::type_name::<T>(),
    })
}

/// Marshalling facts about a tool method.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MethodMetadata {
    returns_void: bool,
    parameter_positions: HashMap<String, usize>,
    session_id_position: Option<usize>,
    session_id_optional: bool,
}

impl MethodMetadata {
    /// Creates metadata from its parts.
    #[must_use]
    pub fn new(
        returns_void: bool,
        parameter_positions: HashMap<String, usize>,
        session_id_position: Option<usize>,
    ) -> Self {
        Self {
            returns_void,
            parameter_positions,
            session_id_position,
            session_id_optional: false,
        }
    }

    /// Lets the session slot stay `null` when the caller has no session.
    #[must_use]
    pub const fn with_optional_session_id(mut self) -> Self {
        self.session_id_optional = true;
        self
    }

    /// Returns `true` when the method produces no value.
    #[must_use]
    pub const fn returns_void(&self) -> bool {
        self.returns_void
    }

    /// Returns the position of every declared parameter, session slot included.
    #[must_use]
    pub fn parameter_positions(&self) -> &HashMap<String, usize> {
        &self.parameter_positions
    }

    /// Returns the position of a named parameter.
    #[must_use]
    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.parameter_positions.get(name).copied()
    }

    /// Returns the session identity slot, if the method declares one.
    #[must_use]
    pub const fn session_id_position(&self) -> Option<usize> {
        self.session_id_position
    }

    /// Returns `true` when calls must carry a session.
    #[must_use]
    pub const fn requires_session_id(&self) -> bool {
        self.session_id_position.is_some() && !self.session_id_optional
    }

    /// Returns the name of the parameter at `position`.
    #[must_use]
    pub fn parameter_at(&self, position: usize) -> Option<&str> {
        self.parameter_positions
            .iter()
            .find_map(|(name, &slot)| (slot == position).then_some(name.as_str()))
    }

    /// Number of positional arguments the method takes.
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        self.parameter_positions.len()
    }
}

/// Errors raised while dispatching a call.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The positional array does not match the declared parameters.
    #[error("tool `{tool}` expects {expected} argument(s), got {actual}")]
    ArgumentCount {
        /// Tool name.
        tool: String,
        /// Declared parameter count.
        expected: usize,
        /// Supplied argument count.
        actual: usize,
    },

    /// A required argument was not supplied.
    #[error("tool `{tool}` is missing required argument `{name}`")]
    MissingArgument {
        /// Tool name.
        tool: String,
        /// Parameter name.
        name: String,
    },

    /// The supplied arguments could not be interpreted.
    #[error("invalid arguments for tool `{tool}`: {reason}")]
    InvalidArguments {
        /// Tool name.
        tool: String,
        /// Human-readable reason.
        reason: String,
    },

    /// The worker task running the call failed to complete.
    #[error("worker running tool `{tool}` failed: {reason}")]
    Join {
        /// Tool name.
        tool: String,
        /// Human-readable reason.
        reason: String,
    },

    /// Error raised by the tool method itself.
    #[error(transparent)]
    Target(#[from] anyhow::Error),
}

fn success() -> Value {
    Value::String(SUCCESS.to_owned())
}

/// Invokes one tool method and normalises its result.
#[derive(Clone)]
pub struct Dispatcher {
    tool: Arc<str>,
    metadata: Arc<MethodMetadata>,
    mode: ExecutionMode,
    target: Arc<dyn ToolTarget>,
    traced: bool,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("tool", &self.tool)
            .field("mode", &self.mode)
            .field("metadata", &self.metadata)
            .field("traced", &self.traced)
            .finish_non_exhaustive()
    }
}

/// Builds a blocking dispatcher for `target`.
#[must_use]
pub fn build_dispatcher(metadata: MethodMetadata, target: Arc<dyn ToolTarget>) -> Dispatcher {
    Dispatcher {
        tool: Arc::from(""),
        metadata: Arc::new(metadata),
        mode: ExecutionMode::default(),
        target,
        traced: false,
    }
}

impl Dispatcher {
    /// Names the tool in errors and spans.
    #[must_use]
    pub fn with_tool_name(mut self, tool: impl AsRef<str>) -> Self {
        self.tool = Arc::from(tool.as_ref());
        self
    }

    /// Sets the scheduling used by [`Dispatcher::execute`].
    #[must_use]
    pub const fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Runs every [`Dispatcher::execute`] call inside a `tool` span.
    #[must_use]
    pub const fn instrumented(mut self, enabled: bool) -> Self {
        self.traced = enabled;
        self
    }

    /// Returns `true` when calls run inside a `tool` span.
    #[must_use]
    pub const fn is_instrumented(&self) -> bool {
        self.traced
    }

    /// Returns the tool name.
    #[must_use]
    pub fn tool_name(&self) -> &str {
        &self.tool
    }

    /// Returns the marshalling metadata.
    #[must_use]
    pub fn metadata(&self) -> &MethodMetadata {
        &self.metadata
    }

    /// Returns the execution mode.
    #[must_use]
    pub const fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Calls the target on the current thread.
    ///
    /// Void methods, including futures that complete without a value, yield
    /// [`SUCCESS`]; every other result is passed through unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::ArgumentCount`] when `args` does not match the
    /// declared parameters and [`DispatchError::Target`] when the method fails.
    pub fn invoke(&self, receiver: Receiver, args: Vec<Value>) -> DispatchResult<ToolOutput> {
        let expected = self.metadata.parameter_count();
        if args.len() != expected {
            return Err(DispatchError::ArgumentCount {
                tool: self.tool.to_string(),
                expected,
                actual: args.len(),
            });
        }

        let output = self.target.call(receiver, args)?;
        if !self.metadata.returns_void() {
            return Ok(output);
        }
        Ok(match output {
            ToolOutput::Ready(_) => ToolOutput::Ready(success()),
            ToolOutput::Pending(future) => ToolOutput::pending(async move {
                future.await?;
                Ok(success())
            }),
        })
    }

    /// Calls the target according to its execution mode and waits for the
    /// result.
    ///
    /// Virtual-thread tools run on a spawned `tokio` task and therefore
    /// require a running runtime.
    ///
    /// # Errors
    ///
    /// Same as [`Dispatcher::invoke`], plus [`DispatchError::Join`] when the
    /// worker task panics or is cancelled.
    pub async fn execute(&self, receiver: Receiver, args: Vec<Value>) -> DispatchResult<Value> {
        if self.traced {
            let span = info_span!("tool", tool = %self.tool, mode = %self.mode);
            self.run(receiver, args).instrument(span).await
        } else {
            self.run(receiver, args).await
        }
    }

    async fn run(&self, receiver: Receiver, args: Vec<Value>) -> DispatchResult<Value> {
        debug!(tool = %self.tool, mode = %self.mode, "dispatching tool call");
        match self.mode {
            ExecutionMode::Blocking | ExecutionMode::NonBlocking => {
                Ok(self.invoke(receiver, args)?.resolve().await?)
            }
            ExecutionMode::VirtualThread => {
                let this = self.clone();
                let worker = tokio::spawn(async move {
                    let output = this.invoke(receiver, args)?;
                    Ok::<_, DispatchError>(output.resolve().await?)
                });
                worker.await.map_err(|err| DispatchError::Join {
                    tool: self.tool.to_string(),
                    reason: err.to_string(),
                })?
            }
        }
    }
}
