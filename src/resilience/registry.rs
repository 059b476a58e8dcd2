//! Per-breaker call counters and derived rates.

use serde::Serialize;

/// Mutable counters owned by exactly one breaker.
///
/// The breaker keeps this behind its own lock; nothing else mutates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsRegistry {
    pub failure_count: u64,
    pub success_count: u64,
    pub total_requests: u64,
    pub slow_call_count: u64,
    pub last_failure_time: Option<u64>,
    pub last_success_time: Option<u64>,
    pub state_transition_count: u64,
    pub created_at: u64,
}

impl MetricsRegistry {
    /// Create an empty registry stamped with `now_ms` (epoch millis).
    pub fn new(now_ms: u64) -> Self {
        Self {
            failure_count: 0,
            success_count: 0,
            total_requests: 0,
            slow_call_count: 0,
            last_failure_time: None,
            last_success_time: None,
            state_transition_count: 0,
            created_at: now_ms,
        }
    }

    pub fn record_success(&mut self, slow: bool, now_ms: u64) {
        self.success_count += 1;
        self.total_requests += 1;
        if slow {
            self.slow_call_count += 1;
        }
        self.last_success_time = Some(now_ms);
    }

    pub fn record_failure(&mut self, now_ms: u64) {
        self.failure_count += 1;
        self.total_requests += 1;
        self.last_failure_time = Some(now_ms);
    }

    pub fn record_transition(&mut self) {
        self.state_transition_count += 1;
    }

    /// Start a new evaluation window.
    ///
    /// Clears the call counters only; timestamps, the transition count and
    /// `created_at` survive.
    pub fn reset_window(&mut self) {
        self.failure_count = 0;
        self.success_count = 0;
        self.total_requests = 0;
        self.slow_call_count = 0;
    }

    pub fn failure_rate(&self) -> f64 {
        ratio(self.failure_count, self.total_requests)
    }

    pub fn success_rate(&self) -> f64 {
        ratio(self.success_count, self.total_requests)
    }

    pub fn slow_call_rate(&self) -> f64 {
        ratio(self.slow_call_count, self.total_requests)
    }
}

fn ratio(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64
    }
}

/// Serializable point-in-time view of a breaker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub name: String,
    pub state: super::CircuitState,
    pub enabled: bool,
    pub failure_count: u64,
    pub success_count: u64,
    pub total_requests: u64,
    pub slow_call_count: u64,
    pub failure_rate: f64,
    pub success_rate: f64,
    pub slow_call_rate: f64,
    pub last_failure_time: Option<u64>,
    pub last_success_time: Option<u64>,
    pub state_transition_count: u64,
    pub created_at: u64,
    pub uptime_ms: u64,
}

impl MetricsSnapshot {
    pub(crate) fn capture(
        name: &str,
        state: super::CircuitState,
        enabled: bool,
        registry: &MetricsRegistry,
        now_ms: u64,
    ) -> Self {
        Self {
            name: name.to_string(),
            state,
            enabled,
            failure_count: registry.failure_count,
            success_count: registry.success_count,
            total_requests: registry.total_requests,
            slow_call_count: registry.slow_call_count,
            failure_rate: registry.failure_rate(),
            success_rate: registry.success_rate(),
            slow_call_rate: registry.slow_call_rate(),
            last_failure_time: registry.last_failure_time,
            last_success_time: registry.last_success_time,
            state_transition_count: registry.state_transition_count,
            created_at: registry.created_at,
            uptime_ms: now_ms.saturating_sub(registry.created_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_and_rates() {
        let mut m = MetricsRegistry::new(1_000);
        m.record_success(false, 1_001);
        m.record_success(true, 1_002);
        m.record_failure(1_003);
        m.record_failure(1_004);

        assert_eq!(m.total_requests, 4);
        assert_eq!(m.slow_call_count, 1);
        assert_eq!(m.failure_rate(), 0.5);
        assert_eq!(m.success_rate(), 0.5);
        assert_eq!(m.slow_call_rate(), 0.25);
        assert_eq!(m.last_failure_time, Some(1_004));
        assert_eq!(m.last_success_time, Some(1_002));
    }

    #[test]
    fn test_rates_are_zero_without_traffic() {
        let m = MetricsRegistry::new(0);
        assert_eq!(m.failure_rate(), 0.0);
        assert_eq!(m.slow_call_rate(), 0.0);
    }

    #[test]
    fn test_reset_window_keeps_history() {
        let mut m = MetricsRegistry::new(5);
        m.record_failure(10);
        m.record_transition();
        m.reset_window();

        assert_eq!(m.failure_count, 0);
        assert_eq!(m.total_requests, 0);
        assert_eq!(m.state_transition_count, 1);
        assert_eq!(m.last_failure_time, Some(10));
        assert_eq!(m.created_at, 5);
    }
}
