//! Configuration management for the agent toolkit.
//!
//! [`ToolkitConfig`] is read from TOML and then adjusted by `AGENT_TOOLKIT_*`
//! environment variables:
//!
//! | Variable | Field |
//! |----------|-------|
//! | `AGENT_TOOLKIT_SPAN_WRAPPING` | `tools.span_wrapping` |
//! | `AGENT_TOOLKIT_REMOVED_TYPES` | `tools.removed_types` (comma separated) |
//! | `AGENT_TOOLKIT_LOG` | `telemetry.filter` |
//! | `AGENT_TOOLKIT_OLLAMA_BASE_URL` | `ollama.base_url` |
//! | `AGENT_TOOLKIT_OLLAMA_MODEL` | `ollama.model` |
//! | `AGENT_TOOLKIT_OLLAMA_TIMEOUT_SECS` | `ollama.timeout_secs` |
//! | `AGENT_TOOLKIT_OLLAMA_TEMPERATURE` | `ollama.temperature` |

#![warn(missing_docs, clippy::pedantic)]

pub mod loader;
pub mod schema;

pub use loader::{ENV_PREFIX, load, load_file};
pub use schema::{OllamaSettings, TelemetryConfig, ToolkitConfig, ToolsConfig};
