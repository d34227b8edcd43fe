//! Strongly typed configuration schemas.

use std::collections::HashSet;
use std::time::Duration;

use agent_primitives::TypeName;
use serde::{Deserialize, Serialize};

const DEFAULT_LOG_FILTER: &str = "info";
const DEFAULT_OLLAMA_BASE_URL: &str = "http://127.0.0.1:11434/";
const DEFAULT_OLLAMA_MODEL: &str = "llama3.1";
const DEFAULT_OLLAMA_TIMEOUT_SECS: u64 = 60;

/// Root configuration document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolkitConfig {
    /// Tool discovery and registry settings.
    pub tools: ToolsConfig,
    /// Logging settings.
    pub telemetry: TelemetryConfig,
    /// Ollama chat model settings.
    pub ollama: OllamaSettings,
}

/// Settings applied while discovering and publishing tools.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Wrap every dispatcher in a tracing span.
    pub span_wrapping: bool,
    /// Owners whose tools are dropped from the published registry.
    pub removed_types: Vec<TypeName>,
}

impl ToolsConfig {
    /// Returns the removed owners as a lookup set.
    #[must_use]
    pub fn removed_type_set(&self) -> HashSet<TypeName> {
        self.removed_types.iter().cloned().collect()
    }
}

/// Logging settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_owned(),
        }
    }
}

/// Connection settings for an Ollama daemon.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaSettings {
    /// Base URL of the daemon.
    pub base_url: String,
    /// Model to chat with.
    pub model: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Sampling temperature used when a request does not set one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl OllamaSettings {
    /// Returns the request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for OllamaSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OLLAMA_BASE_URL.to_owned(),
            model: DEFAULT_OLLAMA_MODEL.to_owned(),
            timeout_secs: DEFAULT_OLLAMA_TIMEOUT_SECS,
            temperature: None,
        }
    }
}
