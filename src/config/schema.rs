//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the worker gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Global breaker switch. When false, calls bypass all state logic.
    pub enabled: bool,

    /// Downstream worker connection settings.
    pub worker: WorkerConfig,

    /// Breaker guarding the primary workload.
    pub breaker: BreakerConfig,

    /// Breaker guarding the health-check probe.
    pub health_breaker: BreakerConfig,

    /// Retry settings for `execute_call_with_retry`.
    pub retry: RetryConfig,

    /// Periodic health check settings.
    pub health_check: HealthCheckConfig,

    /// Admin control surface.
    pub admin: AdminConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            worker: WorkerConfig::default(),
            breaker: BreakerConfig::default(),
            health_breaker: BreakerConfig::health_probe(),
            retry: RetryConfig::default(),
            health_check: HealthCheckConfig::default(),
            admin: AdminConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Downstream worker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Service name used for metric labels and logs.
    pub service_name: String,

    /// Base URL of the worker (e.g., "http://127.0.0.1:8001").
    pub base_url: String,

    /// Shared key sent as `x-api-key`.
    pub api_key: String,

    /// Connection establishment timeout in milliseconds.
    pub connect_timeout_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            service_name: "ai-worker".to_string(),
            base_url: "http://127.0.0.1:8001".to_string(),
            api_key: "dev-secret".to_string(),
            connect_timeout_ms: 2_000,
        }
    }
}

/// Circuit breaker thresholds for one breaker instance.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// Absolute failure count that forces Open regardless of volume.
    pub failure_threshold: u32,

    /// Minimum total requests before percentage evaluation applies.
    pub request_volume_threshold: u32,

    /// Failure percentage (0-100) that trips the breaker.
    pub error_percentage_threshold: f64,

    /// Successful calls slower than this count as slow.
    pub slow_call_duration_threshold_ms: u64,

    /// Slow-call percentage (0-100) that trips the breaker.
    pub slow_call_percentage_threshold: f64,

    /// Delay before Open -> HalfOpen.
    pub reset_timeout_ms: u64,

    /// Per-call timeout applied to the downstream operation.
    pub call_timeout_ms: u64,

    /// Capacity of the event journal.
    pub max_events_in_history: usize,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            request_volume_threshold: 10,
            error_percentage_threshold: 50.0,
            slow_call_duration_threshold_ms: 5_000,
            slow_call_percentage_threshold: 50.0,
            reset_timeout_ms: 30_000,
            call_timeout_ms: 10_000,
            max_events_in_history: 100,
        }
    }
}

impl BreakerConfig {
    /// Looser defaults for the lightweight health probe breaker.
    pub fn health_probe() -> Self {
        Self {
            failure_threshold: 10,
            request_volume_threshold: 5,
            error_percentage_threshold: 80.0,
            slow_call_duration_threshold_ms: 1_000,
            slow_call_percentage_threshold: 80.0,
            reset_timeout_ms: 15_000,
            call_timeout_ms: 3_000,
            max_events_in_history: 50,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Additional attempts after the first call.
    pub max_retries: u32,

    /// Delay before the first retry in milliseconds.
    pub initial_delay_ms: u64,

    /// Exponential growth factor between retries.
    pub multiplier: f64,

    /// Maximum delay between retries in milliseconds.
    pub max_delay_ms: u64,

    /// Apply ±10% jitter to each delay.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 100,
            multiplier: 2.0,
            max_delay_ms: 5_000,
            jitter: true,
        }
    }
}

/// Periodic health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Enable the periodic health monitor.
    pub enabled: bool,

    /// Interval between probes in seconds.
    pub interval_secs: u64,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 10,
        }
    }
}

/// Admin control surface configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Serve the admin API.
    pub enabled: bool,

    /// Bind address for the admin listener.
    pub bind_address: String,

    /// Bearer key required on admin routes.
    pub api_key: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: "127.0.0.1:8081".to_string(),
            api_key: "admin-secret-key".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default `EnvFilter` directive when `RUST_LOG` is unset.
    pub log_filter: String,

    /// Install the Prometheus recorder and serve `/metrics`.
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_filter: "worker_gateway=info,tower_http=info".to_string(),
            metrics_enabled: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_toml_uses_defaults() {
        let config: GatewayConfig = toml::from_str("").unwrap();
        assert!(config.enabled);
        assert_eq!(config.breaker, BreakerConfig::default());
        assert_eq!(config.health_breaker, BreakerConfig::health_probe());
        assert_eq!(config.retry.max_retries, 3);
    }

    #[test]
    fn test_partial_section_override() {
        let config: GatewayConfig = toml::from_str(
            r#"
            enabled = false

            [breaker]
            failure_threshold = 2
            reset_timeout_ms = 500

            [worker]
            base_url = "http://worker:9000"
            "#,
        )
        .unwrap();

        assert!(!config.enabled);
        assert_eq!(config.breaker.failure_threshold, 2);
        assert_eq!(config.breaker.reset_timeout_ms, 500);
        assert_eq!(config.breaker.request_volume_threshold, 10);
        assert_eq!(config.worker.base_url, "http://worker:9000");
        assert_eq!(config.worker.service_name, "ai-worker");
    }
}
