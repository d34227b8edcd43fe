//! Wiring between configuration and the tool pipeline.

use agent_config::ToolsConfig;
use agent_tools::{PublishError, ToolDiscovery, ToolRegistry, TypeIndex};
use tracing::info;

/// Discovers every `#[tools]` type, publishes the registry and drops the
/// owners listed in `tools.removed_types`.
///
/// # Errors
///
/// Returns [`PublishError`] when discovery collected fatal errors such as
/// duplicate tool names.
pub fn publish_declared_tools(
    index: TypeIndex,
    config: &ToolsConfig,
) -> Result<ToolRegistry, PublishError> {
    let registry = ToolDiscovery::new(index)
        .span_wrapping(config.span_wrapping)
        .discover_declared()
        .publish()?;

    if config.removed_types.is_empty() {
        return Ok(registry);
    }
    let registry = registry.without_removed(&config.removed_type_set());
    info!(tools = registry.len(), "applied removed tool owners");
    Ok(registry)
}

/// Builds an Ollama adapter from configuration.
///
/// # Errors
///
/// Returns [`agent_adapters::AdapterError::Configuration`] when the base URL
/// is invalid.
#[cfg(feature = "adapters")]
pub fn ollama_adapter(
    settings: &agent_config::OllamaSettings,
) -> agent_adapters::AdapterResult<agent_adapters::OllamaAdapter> {
    let mut config = agent_adapters::OllamaConfig::new(settings.model.as_str())
        .with_base_url(&settings.base_url)?
        .with_timeout(settings.timeout());
    if let Some(temperature) = settings.temperature {
        config = config.with_default_temperature(temperature);
    }
    agent_adapters::OllamaAdapter::new(config)
}
