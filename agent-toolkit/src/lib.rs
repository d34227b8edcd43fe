//! Tool registry and invocation contracts for LLM agents.
//!
//! Depend on this crate via `cargo add agent-toolkit`. It bundles the
//! workspace crates behind feature flags so downstream users can enable or
//! disable components as needed.

#![warn(missing_docs, clippy::pedantic)]

/// Re-export shared primitives for convenience.
pub use agent_primitives as primitives;

/// Tool descriptors, dispatchers and the registry (enabled by `tools` feature).
#[cfg(feature = "tools")]
pub use agent_tools as tools;

/// Chat model adapters (enabled by `adapters` feature).
#[cfg(feature = "adapters")]
pub use agent_adapters as adapters;

/// Tracing setup (enabled by `telemetry` feature).
#[cfg(feature = "telemetry")]
pub use agent_telemetry as telemetry;

/// Configuration management (enabled by `config` feature).
#[cfg(feature = "config")]
pub use agent_config as config;

#[cfg(all(feature = "tools", feature = "config"))]
mod bootstrap;

#[cfg(all(feature = "tools", feature = "config"))]
pub use bootstrap::publish_declared_tools;

#[cfg(all(feature = "tools", feature = "adapters", feature = "config"))]
pub use bootstrap::ollama_adapter;
