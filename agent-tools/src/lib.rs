//! Tool registry and invocation contracts for agent runtimes.
//!
//! Methods annotated as tools are described for the model ([`ToolDescriptor`]),
//! bound to a runtime invoker ([`Dispatcher`]), and published in an immutable
//! [`ToolRegistry`] keyed by owning type. [`ToolDiscovery`] drives the build
//! phase; [`ToolExecutor`] runs model-issued calls against the result.
//!
//! ```ignore
//! use agent_tools::{tools, ToolDiscovery, TypeIndex};
//!
//! struct Calculator;
//!
//! #[tools]
//! impl Calculator {
//!     #[tool(description = "Adds two integers")]
//!     fn add(&self, a: i64, b: i64) -> i64 {
//!         a + b
//!     }
//! }
//!
//! let registry = ToolDiscovery::new(TypeIndex::new()).discover_declared().publish()?;
//! ```

#![warn(missing_docs, clippy::pedantic)]

pub mod arguments;
pub mod builtin;
pub mod descriptor;
pub mod discovery;
pub mod dispatch;
pub mod error;
pub mod execution;
pub mod executor;
pub mod method;
pub mod registry;
pub mod schema;

pub use agent_primitives::{SessionId, TypeName};
pub use agent_tools_macros::{ToolParam, tools};

pub use arguments::ArgumentMapper;
pub use builtin::{WebSearchEngine, WebSearchResult, WebSearchTool, web_search_engine};
pub use descriptor::{DescriptorFactory, ToolDescriptor, ToolDescriptorBuilder, ToolParameter};
pub use discovery::{DiscoveryReport, ToolDiscovery};
pub use dispatch::{
    DispatchError, DispatchResult, Dispatcher, MethodMetadata, Receiver, SUCCESS, ToolOutput,
    ToolTarget, build_dispatcher,
};
pub use error::{PublishError, ToolError, ToolResult};
pub use execution::{ExecutionAnnotation, ExecutionMode};
pub use executor::{
    ExecutorError, ExecutorResult, ReceiverResolver, Receivers, ToolExecutionRequest,
    ToolExecutor,
};
pub use method::{
    MethodParameter, ReturnType, ToolDeclaration, ToolHost, ToolMethod, TypeIndex, TypeInfo,
    TypeKind,
};
pub use registry::{RegistryEntry, ToolRegistry, ToolRegistryBuilder};
pub use schema::{
    FloatKind, IntegerKind, ParameterAnnotation, SchemaProperty, SchemaType, SemanticType,
    ToolParam, map_parameter,
};

/// Support code for `#[tools]` expansions. Not a stable API.
#[doc(hidden)]
pub mod __private {
    use std::any::Any;
    use std::sync::Arc;

    use anyhow::Context;
    use serde::Serialize;
    use serde::de::DeserializeOwned;
    use serde_json::Value;

    pub use anyhow;
    pub use inventory;

    use crate::dispatch::{Receiver, ToolOutput, downcast_receiver};

    /// Downcasts the receiver of a generated target.
    ///
    /// # Errors
    ///
    /// Fails when the receiver holds another type.
    pub fn receiver<T: Any + Send + Sync>(receiver: Receiver) -> anyhow::Result<Arc<T>> {
        Ok(downcast_receiver::<T>(receiver)?)
    }

    /// Decodes the next positional argument.
    ///
    /// # Errors
    ///
    /// Fails when the value does not deserialize into `T`.
    pub fn argument<T: DeserializeOwned>(
        args: &mut impl Iterator<Item = Value>,
        name: &str,
    ) -> anyhow::Result<T> {
        serde_json::from_value(args.next().unwrap_or_default())
            .with_context(|| format!("invalid value for parameter `{name}`"))
    }

    /// Serializes a plain return value.
    ///
    /// # Errors
    ///
    /// Fails when the value cannot be represented as JSON.
    pub fn to_value<T: Serialize>(value: T) -> anyhow::Result<Value> {
        Ok(serde_json::to_value(value)?)
    }

    /// Serializes the success value of a fallible method.
    ///
    /// # Errors
    ///
    /// Returns the method's error, or a serialization failure.
    pub fn from_result<T, E>(result: Result<T, E>) -> anyhow::Result<Value>
    where
        T: Serialize,
        E: Into<anyhow::Error>,
    {
        to_value(result.map_err(Into::<anyhow::Error>::into)?)
    }

    /// Wraps an immediately available result.
    ///
    /// # Errors
    ///
    /// Propagates `value`'s error.
    pub fn ready(value: anyhow::Result<Value>) -> anyhow::Result<ToolOutput> {
        value.map(ToolOutput::Ready)
    }

    /// Target body for methods that cannot be dispatched.
    ///
    /// # Errors
    ///
    /// Always fails.
    pub fn unsupported(method: &str) -> anyhow::Result<ToolOutput> {
        anyhow::bail!("method `{method}` returns a stream and cannot be invoked as a tool")
    }
}
