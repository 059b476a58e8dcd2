//! Trip decision for a closed breaker.
//!
//! Rule order matters: the absolute failure count short-circuits volume
//! gating, and volume gating keeps small samples from tripping on rates.

use std::fmt;

use crate::config::BreakerConfig;
use crate::resilience::registry::MetricsRegistry;

/// Why the evaluator decided to open the circuit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TripReason {
    FailureCount { failures: u64, threshold: u32 },
    ErrorRate { rate: f64, threshold: f64 },
    SlowCallRate { rate: f64, threshold: f64 },
}

impl fmt::Display for TripReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TripReason::FailureCount { failures, threshold } => {
                write!(f, "failure count {failures} reached threshold {threshold}")
            }
            TripReason::ErrorRate { rate, threshold } => {
                write!(f, "error rate {:.1}% reached threshold {threshold}%", rate * 100.0)
            }
            TripReason::SlowCallRate { rate, threshold } => {
                write!(f, "slow call rate {:.1}% reached threshold {threshold}%", rate * 100.0)
            }
        }
    }
}

/// Return the first matching trip rule, if any.
pub fn evaluate(metrics: &MetricsRegistry, config: &BreakerConfig) -> Option<TripReason> {
    if metrics.failure_count >= u64::from(config.failure_threshold) {
        return Some(TripReason::FailureCount {
            failures: metrics.failure_count,
            threshold: config.failure_threshold,
        });
    }

    if metrics.total_requests == 0 || metrics.total_requests < u64::from(config.request_volume_threshold) {
        return None;
    }

    let error_rate = metrics.failure_rate();
    if error_rate >= config.error_percentage_threshold / 100.0 {
        return Some(TripReason::ErrorRate {
            rate: error_rate,
            threshold: config.error_percentage_threshold,
        });
    }

    let slow_rate = metrics.slow_call_rate();
    if slow_rate >= config.slow_call_percentage_threshold / 100.0 {
        return Some(TripReason::SlowCallRate {
            rate: slow_rate,
            threshold: config.slow_call_percentage_threshold,
        });
    }

    None
}

/// Whether the breaker should open.
pub fn should_trip(metrics: &MetricsRegistry, config: &BreakerConfig) -> bool {
    evaluate(metrics, config).is_some()
}
