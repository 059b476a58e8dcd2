//! Metrics collection and exposition.
//!
//! # Metrics
//! - `circuit_breaker_state` (gauge): 0=closed, 1=open, 2=half-open
//! - `circuit_breaker_requests_total` (counter): calls that reached the downstream
//! - `circuit_breaker_failures_total` (counter): failed or timed-out calls
//! - `circuit_breaker_slow_calls_total` (counter): successful calls over the slow threshold
//! - `circuit_breaker_state_transitions_total` (counter): state transitions
//!
//! Every series carries a `service` label naming the protected breaker.
//! Counters are lifetime totals, incremented as outcomes are recorded; the
//! breaker's evaluation window resets never touch them.

use metrics::{counter, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

use crate::resilience::CircuitState;

/// Outcome of one call that reached the downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    Success { slow: bool },
    Failure,
}

/// Install the global Prometheus recorder.
///
/// The returned handle renders the text exposition for `GET /metrics`.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    tracing::info!("Prometheus recorder installed");
    Ok(handle)
}

/// Register every series of a new breaker so scrapes see zeros, not gaps.
pub fn register_breaker(service: &str, state: CircuitState) {
    let service = service.to_string();
    record_state(&service, state);
    counter!("circuit_breaker_requests_total", "service" => service.clone()).increment(0);
    counter!("circuit_breaker_failures_total", "service" => service.clone()).increment(0);
    counter!("circuit_breaker_slow_calls_total", "service" => service.clone()).increment(0);
    counter!("circuit_breaker_state_transitions_total", "service" => service).increment(0);
}

pub fn record_state(service: &str, state: CircuitState) {
    gauge!("circuit_breaker_state", "service" => service.to_string()).set(state.as_gauge());
}

pub fn record_call(service: &str, outcome: CallOutcome) {
    let service = service.to_string();
    counter!("circuit_breaker_requests_total", "service" => service.clone()).increment(1);
    match outcome {
        CallOutcome::Success { slow: true } => {
            counter!("circuit_breaker_slow_calls_total", "service" => service).increment(1)
        }
        CallOutcome::Success { slow: false } => {}
        CallOutcome::Failure => {
            counter!("circuit_breaker_failures_total", "service" => service).increment(1)
        }
    }
}

pub fn record_transition(service: &str) {
    counter!("circuit_breaker_state_transitions_total", "service" => service.to_string()).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exposition_contains_labelled_series() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            register_breaker("ai-worker", CircuitState::Closed);
            record_call("ai-worker", CallOutcome::Failure);
            record_call("ai-worker", CallOutcome::Success { slow: true });
            record_transition("ai-worker");
            record_state("ai-worker", CircuitState::Open);
        });

        let text = handle.render();
        assert!(text.contains("circuit_breaker_state{service=\"ai-worker\"} 1"));
        assert!(text.contains("circuit_breaker_requests_total{service=\"ai-worker\"} 2"));
        assert!(text.contains("circuit_breaker_failures_total{service=\"ai-worker\"} 1"));
        assert!(text.contains("circuit_breaker_slow_calls_total{service=\"ai-worker\"} 1"));
        assert!(text.contains("circuit_breaker_state_transitions_total{service=\"ai-worker\"} 1"));
    }

    #[test]
    fn test_fresh_breaker_exports_zeros() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || register_breaker("idle", CircuitState::Closed));

        let text = handle.render();
        assert!(text.contains("circuit_breaker_state{service=\"idle\"} 0"));
        assert!(text.contains("circuit_breaker_requests_total{service=\"idle\"} 0"));
        assert!(text.contains("circuit_breaker_failures_total{service=\"idle\"} 0"));
    }
}
