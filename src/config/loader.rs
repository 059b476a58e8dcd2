//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load, override from the environment, and validate a TOML file.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content, |key| std::env::var(key).ok())
}

/// Parse configuration text, applying overrides from `env` before validation.
pub fn parse_config<F>(content: &str, env: F) -> Result<GatewayConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config: GatewayConfig = toml::from_str(content)?;
    apply_env_overrides(&mut config, env);
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Environment variables that override file values.
fn apply_env_overrides<F>(config: &mut GatewayConfig, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = env("WORKER_BASE_URL") {
        config.worker.base_url = url;
    }
    if let Some(key) = env("GATEWAY_API_KEY") {
        config.worker.api_key = key;
    }
    if let Some(flag) = env("CIRCUIT_BREAKER_ENABLED") {
        match flag.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => config.enabled = true,
            "0" | "false" | "no" => config.enabled = false,
            other => tracing::warn!(value = %other, "Ignoring unrecognised CIRCUIT_BREAKER_ENABLED"),
        }
    }
}
