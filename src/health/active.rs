//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe the worker through its health breaker
//! - Log transitions between healthy and degraded

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time;

use crate::config::HealthCheckConfig;
use crate::resilience::{BreakerControl, HealthResult};

pub struct HealthMonitor {
    service: Arc<dyn BreakerControl>,
    config: HealthCheckConfig,
}

impl HealthMonitor {
    pub fn new(service: Arc<dyn BreakerControl>, config: HealthCheckConfig) -> Self {
        Self { service, config }
    }

    /// Probe until a shutdown signal arrives. Returns the number of probes run.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) -> u64 {
        if !self.config.enabled {
            tracing::info!("Active health checks disabled");
            return 0;
        }

        tracing::info!(
            service = %self.service.name(),
            interval = self.config.interval_secs,
            "Health monitor starting"
        );

        let mut ticker = time::interval(Duration::from_secs(self.config.interval_secs));
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
        let mut healthy = true;
        let mut probes = 0;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let result = self.service.check_health().await;
                    probes += 1;
                    healthy = self.report(healthy, &result);
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
        probes
    }

    fn report(&self, was_healthy: bool, result: &HealthResult) -> bool {
        let service = self.service.name();
        match (was_healthy, result.healthy) {
            (true, false) => tracing::warn!(
                service = %service,
                state = %result.state,
                error = result.error.as_deref().unwrap_or("unknown"),
                "Worker health degraded"
            ),
            (false, true) => tracing::info!(
                service = %service,
                latency_ms = result.latency_ms,
                "Worker health recovered"
            ),
            (false, false) => tracing::debug!(
                service = %service,
                state = %result.state,
                "Worker still unhealthy"
            ),
            (true, true) => tracing::trace!(service = %service, latency_ms = result.latency_ms, "Worker healthy"),
        }
        result.healthy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::Shutdown;
    use crate::resilience::scheduler::ManualScheduler;
    use crate::resilience::{DownstreamError, GuardedService};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn service(probes: Arc<AtomicU32>) -> Arc<GuardedService<(), ()>> {
        Arc::new(
            GuardedService::builder("ai-worker")
                .scheduler(Arc::new(ManualScheduler::new()))
                .health_probe(move |_: ()| {
                    probes.fetch_add(1, Ordering::SeqCst);
                    async { Ok::<_, DownstreamError>(()) }
                })
                .build(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_probes_on_interval_until_shutdown() {
        let probes = Arc::new(AtomicU32::new(0));
        let shutdown = Shutdown::new();
        let monitor = HealthMonitor::new(
            service(probes.clone()),
            HealthCheckConfig {
                enabled: true,
                interval_secs: 10,
            },
        );
        let task = tokio::spawn(monitor.run(shutdown.subscribe()));

        // First tick fires immediately, then at 10s and 20s.
        time::sleep(Duration::from_secs(25)).await;
        shutdown.trigger();

        assert_eq!(task.await.unwrap(), 3);
        assert_eq!(probes.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_disabled_monitor_returns_immediately() {
        let probes = Arc::new(AtomicU32::new(0));
        let shutdown = Shutdown::new();
        let monitor = HealthMonitor::new(
            service(probes.clone()),
            HealthCheckConfig {
                enabled: false,
                interval_secs: 10,
            },
        );

        assert_eq!(monitor.run(shutdown.subscribe()).await, 0);
        assert_eq!(probes.load(Ordering::SeqCst), 0);
    }
}
