//! Logging setup for hosts embedding a toolset session.
//!
//! Output goes to stderr: stdout carries the MCP protocol stream.

#![warn(missing_docs, clippy::pedantic)]

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Directive used when `RUST_LOG` is unset.
pub const DEFAULT_DIRECTIVE: &str = "info";

/// Subscriber options.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Filter applied when `RUST_LOG` is unset or invalid.
    pub default_directive: String,
    /// Include the event target (module path).
    pub with_target: bool,
    /// Emit ANSI colours.
    pub ansi: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            default_directive: DEFAULT_DIRECTIVE.to_owned(),
            with_target: false,
            ansi: false,
        }
    }
}

impl TelemetryConfig {
    /// Overrides the fallback filter directive.
    #[must_use]
    pub fn with_default_directive(mut self, directive: impl Into<String>) -> Self {
        self.default_directive = directive.into();
        self
    }

    /// Toggles event targets.
    #[must_use]
    pub fn with_target(mut self, enabled: bool) -> Self {
        self.with_target = enabled;
        self
    }
}

/// Builds the filter: `RUST_LOG` when it parses, otherwise `fallback`.
///
/// # Errors
///
/// Fails when `fallback` is not a valid directive.
pub fn env_filter(fallback: &str) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(fallback).with_context(|| format!("invalid log directive `{fallback}`"))
}

/// Installs the global `fmt` subscriber.
///
/// # Errors
///
/// Fails for an invalid directive or when a global subscriber is already set.
pub fn init(config: &TelemetryConfig) -> Result<()> {
    let filter = env_filter(&config.default_directive)?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.with_target)
        .with_ansi(config.ansi)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!(err))
        .context("installing tracing subscriber")?;
    debug!(directive = %config.default_directive, "tracing initialised");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_from_partial_json() {
        let config: TelemetryConfig =
            serde_json::from_str(r#"{ "default_directive": "toolset_engine=debug" }"#).unwrap();
        assert_eq!(
            config,
            TelemetryConfig::default().with_default_directive("toolset_engine=debug")
        );
        assert!(!config.ansi);
    }

    #[test]
    fn invalid_fallback_directive_is_reported() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let err = env_filter("toolset_engine=loud").expect_err("invalid directive");
        assert!(err.to_string().contains("invalid log directive"));
        assert!(env_filter("warn,toolset_engine=debug").is_ok());
    }

    #[test]
    fn second_init_fails() {
        let config = TelemetryConfig::default();
        let _ = init(&config);
        assert!(init(&config).is_err());
    }
}
