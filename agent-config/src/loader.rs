//! Configuration loader implementations.

use std::fs;
use std::path::Path;

use agent_primitives::TypeName;
use anyhow::{Context, Result, bail};
use tracing::debug;

use crate::schema::ToolkitConfig;

/// Prefix shared by every configuration environment variable.
pub const ENV_PREFIX: &str = "AGENT_TOOLKIT_";

/// Loads configuration from an optional TOML file, then applies the
/// process environment.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or if an
/// environment override holds an invalid value.
pub fn load(path: Option<&Path>) -> Result<ToolkitConfig> {
    let mut config = match path {
        Some(path) => load_file(path)?,
        None => ToolkitConfig::default(),
    };
    config.apply_env(|key| std::env::var(key).ok())?;
    Ok(config)
}

/// Reads a TOML configuration file without applying environment overrides.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not valid TOML.
pub fn load_file(path: impl AsRef<Path>) -> Result<ToolkitConfig> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    ToolkitConfig::from_toml(&text)
        .with_context(|| format!("failed to parse config file {}", path.display()))
}

impl ToolkitConfig {
    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML for this schema.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("invalid toolkit configuration")
    }

    /// Applies `AGENT_TOOLKIT_*` overrides read through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns an error naming the variable when a value cannot be parsed.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            let key = format!("{ENV_PREFIX}{name}");
            lookup(&key).map(|value| (key, value))
        };

        if let Some((key, value)) = var("SPAN_WRAPPING") {
            self.tools.span_wrapping = parse_bool(&key, &value)?;
        }
        if let Some((key, value)) = var("REMOVED_TYPES") {
            self.tools.removed_types = value
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(|name| TypeName::new(name).with_context(|| format!("invalid type in {key}")))
                .collect::<Result<_>>()?;
        }
        if let Some((_, value)) = var("LOG") {
            self.telemetry.filter = value;
        }
        if let Some((_, value)) = var("OLLAMA_BASE_URL") {
            self.ollama.base_url = value;
        }
        if let Some((_, value)) = var("OLLAMA_MODEL") {
            self.ollama.model = value;
        }
        if let Some((key, value)) = var("OLLAMA_TIMEOUT_SECS") {
            self.ollama.timeout_secs = value
                .trim()
                .parse()
                .with_context(|| format!("{key} must be a whole number of seconds"))?;
        }
        if let Some((key, value)) = var("OLLAMA_TEMPERATURE") {
            let temperature = value
                .trim()
                .parse()
                .with_context(|| format!("{key} must be a number"))?;
            self.ollama.temperature = Some(temperature);
        }

        debug!(
            span_wrapping = self.tools.span_wrapping,
            removed_types = self.tools.removed_types.len(),
            model = %self.ollama.model,
            "toolkit configuration resolved"
        );
        Ok(())
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("{key} must be a boolean, got `{other}`"),
    }
}
