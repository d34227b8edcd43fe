//! Structured tracing helpers.

use anyhow::{Context, Result, anyhow};
use tracing_subscriber::EnvFilter;

/// Builds the filter used by [`init_tracing`].
///
/// `RUST_LOG` wins when it is set; otherwise `fallback` is parsed as an
/// `EnvFilter` directive such as `info,agent_tools=debug`.
///
/// # Errors
///
/// Returns an error if the selected directive cannot be parsed.
pub fn build_filter(fallback: &str) -> Result<EnvFilter> {
    match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directive) if !directive.trim().is_empty() => EnvFilter::try_new(&directive)
            .with_context(|| format!("invalid {} directive `{directive}`", EnvFilter::DEFAULT_ENV)),
        _ => EnvFilter::try_new(fallback)
            .with_context(|| format!("invalid log filter `{fallback}`")),
    }
}

/// Installs a global fmt subscriber filtered by `RUST_LOG` or `fallback`.
///
/// # Errors
///
/// Returns an error if the filter is invalid or a global subscriber is
/// already installed.
pub fn init_tracing(fallback: &str) -> Result<()> {
    let filter = build_filter(fallback)?;
    let directive = filter.to_string();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|err| anyhow!("failed to install tracing subscriber: {err}"))?;
    tracing::info!(filter = %directive, "tracing initialised");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_malformed_directives() {
        if std::env::var(EnvFilter::DEFAULT_ENV).is_ok() {
            return;
        }
        assert!(build_filter("agent_tools=loud").is_err());
        assert!(build_filter("info,agent_tools=debug").is_ok());
    }

    #[test]
    fn filter_keeps_target_directives() {
        if std::env::var(EnvFilter::DEFAULT_ENV).is_ok() {
            return;
        }
        let filter = build_filter("info,agent_tools=debug").expect("valid filter");
        let rendered = filter.to_string();
        assert!(rendered.contains("agent_tools=debug"));
        assert!(rendered.contains("info"));
    }

    #[test]
    fn second_install_fails() {
        if init_tracing("warn").is_ok() {
            assert!(init_tracing("warn").is_err());
        }
    }
}
