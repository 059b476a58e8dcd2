//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and cross-field
//! constraints. Every problem is reported, not just the first one.

use thiserror::Error;
use url::Url;

use crate::config::schema::{BreakerConfig, GatewayConfig, RetryConfig};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Validate a full gateway configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    validate_breaker("breaker", &config.breaker, &mut errors);
    validate_breaker("health_breaker", &config.health_breaker, &mut errors);
    validate_retry(&config.retry, &mut errors);

    if config.worker.service_name.trim().is_empty() {
        errors.push(ValidationError::new("worker.service_name", "must not be empty"));
    }
    if let Err(e) = Url::parse(&config.worker.base_url) {
        errors.push(ValidationError::new("worker.base_url", format!("invalid URL: {e}")));
    }
    if config.health_check.enabled && config.health_check.interval_secs == 0 {
        errors.push(ValidationError::new("health_check.interval_secs", "must be greater than 0"));
    }
    if config.admin.enabled && config.admin.api_key.is_empty() {
        errors.push(ValidationError::new("admin.api_key", "must be set when admin is enabled"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate one breaker section; `prefix` names the section in messages.
pub fn validate_breaker(prefix: &str, config: &BreakerConfig, errors: &mut Vec<ValidationError>) {
    if config.failure_threshold == 0 {
        errors.push(ValidationError::new(
            format!("{prefix}.failure_threshold"),
            "must be greater than 0",
        ));
    }
    for (name, value) in [
        ("error_percentage_threshold", config.error_percentage_threshold),
        ("slow_call_percentage_threshold", config.slow_call_percentage_threshold),
    ] {
        if !(0.0..=100.0).contains(&value) {
            errors.push(ValidationError::new(
                format!("{prefix}.{name}"),
                format!("must be within 0..=100, got {value}"),
            ));
        }
    }
    if config.call_timeout_ms == 0 {
        errors.push(ValidationError::new(
            format!("{prefix}.call_timeout_ms"),
            "must be greater than 0",
        ));
    }
    if config.max_events_in_history == 0 {
        errors.push(ValidationError::new(
            format!("{prefix}.max_events_in_history"),
            "must be greater than 0",
        ));
    }
}

fn validate_retry(config: &RetryConfig, errors: &mut Vec<ValidationError>) {
    if !config.multiplier.is_finite() || config.multiplier < 1.0 {
        errors.push(ValidationError::new(
            "retry.multiplier",
            format!("must be a finite value >= 1.0, got {}", config.multiplier),
        ));
    }
    if config.initial_delay_ms > config.max_delay_ms {
        errors.push(ValidationError::new(
            "retry.initial_delay_ms",
            "must not exceed retry.max_delay_ms",
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&GatewayConfig::default()).is_ok());
    }

    #[test]
    fn test_reports_every_error() {
        let mut config = GatewayConfig::default();
        config.breaker.error_percentage_threshold = 150.0;
        config.breaker.call_timeout_ms = 0;
        config.health_breaker.failure_threshold = 0;
        config.retry.multiplier = 0.5;
        config.worker.base_url = "not a url".to_string();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "breaker.error_percentage_threshold",
                "breaker.call_timeout_ms",
                "health_breaker.failure_threshold",
                "retry.multiplier",
                "worker.base_url",
            ]
        );
    }

    #[test]
    fn test_error_display() {
        let err = ValidationError::new("breaker.failure_threshold", "must be greater than 0");
        assert_eq!(err.to_string(), "breaker.failure_threshold: must be greater than 0");
    }
}
