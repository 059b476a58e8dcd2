//! A downstream service guarded by a primary and a health-probe breaker.
//!
//! The two breakers share nothing: each has its own config, metrics,
//! journal and reset timer. Health probes never count toward the primary.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde::Serialize;
use tokio::time::Instant;

use crate::config::{BreakerConfig, RetryConfig};
use crate::resilience::backoff::BackoffCalculator;
use crate::resilience::circuit_breaker::CircuitBreaker;
use crate::resilience::error::{BreakerError, ControlError};
use crate::resilience::journal::BreakerEvent;
use crate::resilience::operations::{Operation, OperationRegistry};
use crate::resilience::publisher::EventSubscriber;
use crate::resilience::registry::MetricsSnapshot;
use crate::resilience::retries::retry_with_backoff;
use crate::resilience::scheduler::{Scheduler, TokioScheduler};
use crate::resilience::{now_millis, CircuitState};

/// Outcome of one health probe.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthResult {
    pub healthy: bool,
    /// State of the health breaker after the probe.
    pub state: CircuitState,
    pub latency_ms: u64,
    pub error: Option<String>,
    pub checked_at: u64,
}

/// Operator-facing control surface, independent of the payload types.
pub trait BreakerControl: Send + Sync {
    fn name(&self) -> &str;
    fn metrics(&self) -> MetricsSnapshot;
    fn recent_events(&self, limit: usize) -> (Vec<BreakerEvent>, usize);
    fn trip(&self, reason: &str) -> Result<CircuitState, ControlError>;
    fn reset(&self, reason: &str) -> Result<CircuitState, ControlError>;
    fn check_health(&self) -> BoxFuture<'_, HealthResult>;
}

/// Guards every registered operation of one downstream service.
pub struct GuardedService<A, T> {
    name: String,
    primary: Arc<CircuitBreaker>,
    health: Arc<CircuitBreaker>,
    operations: OperationRegistry<A, T>,
    probe: Option<Arc<dyn Operation<(), ()>>>,
    backoff: BackoffCalculator,
    max_retries: u32,
}

impl<A, T> GuardedService<A, T> {
    pub fn builder(name: impl Into<String>) -> GuardedServiceBuilder<A, T> {
        GuardedServiceBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The breaker guarding the primary workload.
    pub fn primary(&self) -> &Arc<CircuitBreaker> {
        &self.primary
    }

    /// The breaker guarding the health probe.
    pub fn health_breaker(&self) -> &Arc<CircuitBreaker> {
        &self.health
    }

    pub fn operation_ids(&self) -> Vec<String> {
        self.operations.ids()
    }

    /// Run a registered operation through the primary breaker.
    pub async fn execute_call(&self, operation_id: &str, args: A) -> Result<T, BreakerError> {
        let operation = self.operations.get(operation_id).ok_or_else(|| {
            tracing::warn!(service = %self.name, operation = operation_id, "Unknown operation");
            BreakerError::NotConfigured(operation_id.to_string())
        })?;
        operation.check(&args).map_err(|reason| {
            tracing::warn!(service = %self.name, operation = operation_id, %reason, "Request rejected by operation");
            BreakerError::InvalidRequest {
                operation: operation_id.to_string(),
                reason,
            }
        })?;
        self.primary.execute(move || operation.call(args)).await
    }

    /// `execute_call` with up to `max_retries` backoff-spaced retries.
    pub async fn execute_call_with_retry(
        &self,
        operation_id: &str,
        args: A,
        max_retries: u32,
    ) -> Result<T, BreakerError>
    where
        A: Clone,
    {
        retry_with_backoff(&self.backoff, max_retries, |_| {
            self.execute_call(operation_id, args.clone())
        })
        .await
    }

    /// `execute_call_with_retry` using the configured retry budget.
    pub async fn execute_with_default_retry(&self, operation_id: &str, args: A) -> Result<T, BreakerError>
    where
        A: Clone,
    {
        self.execute_call_with_retry(operation_id, args, self.max_retries).await
    }

    /// Probe the downstream through the health breaker.
    pub async fn check_health(&self) -> HealthResult {
        let started = Instant::now();
        let result = match &self.probe {
            Some(probe) => {
                let probe = probe.clone();
                self.health.execute(move || probe.call(())).await
            }
            None => Err(BreakerError::NotConfigured("health probe".to_string())),
        };
        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        if let Err(e) = &result {
            tracing::debug!(service = %self.name, error = %e, "Health probe failed");
        }
        HealthResult {
            healthy: result.is_ok(),
            state: self.health.state(),
            latency_ms,
            error: result.err().map(|e| e.to_string()),
            checked_at: now_millis(),
        }
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.primary.metrics()
    }

    pub fn health_metrics(&self) -> MetricsSnapshot {
        self.health.metrics()
    }

    pub fn event_history(&self) -> Vec<BreakerEvent> {
        self.primary.events()
    }

    pub fn trip_circuit_breaker(&self, reason: &str) -> Result<CircuitState, ControlError> {
        self.primary.trip(reason)
    }

    pub fn reset_circuit_breaker(&self, reason: &str) -> Result<CircuitState, ControlError> {
        self.primary.reset(reason)
    }

    pub fn enable(&self) {
        self.primary.set_enabled(true);
        self.health.set_enabled(true);
    }

    pub fn disable(&self) {
        self.primary.set_enabled(false);
        self.health.set_enabled(false);
    }

    pub fn is_enabled(&self) -> bool {
        self.primary.is_enabled()
    }

    /// Register a subscriber on both breakers.
    pub fn subscribe(&self, subscriber: Arc<dyn EventSubscriber>) {
        self.primary.subscribe(subscriber.clone());
        self.health.subscribe(subscriber);
    }
}

impl<A, T> BreakerControl for GuardedService<A, T>
where
    A: Send + 'static,
    T: Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn metrics(&self) -> MetricsSnapshot {
        GuardedService::metrics(self)
    }

    fn recent_events(&self, limit: usize) -> (Vec<BreakerEvent>, usize) {
        self.primary.recent_events(limit)
    }

    fn trip(&self, reason: &str) -> Result<CircuitState, ControlError> {
        self.trip_circuit_breaker(reason)
    }

    fn reset(&self, reason: &str) -> Result<CircuitState, ControlError> {
        self.reset_circuit_breaker(reason)
    }

    fn check_health(&self) -> BoxFuture<'_, HealthResult> {
        Box::pin(GuardedService::check_health(self))
    }
}

/// Builder for [`GuardedService`].
pub struct GuardedServiceBuilder<A, T> {
    name: String,
    breaker: BreakerConfig,
    health_breaker: BreakerConfig,
    retry: RetryConfig,
    enabled: bool,
    scheduler: Arc<dyn Scheduler>,
    backoff_seed: Option<u64>,
    operations: OperationRegistry<A, T>,
    probe: Option<Arc<dyn Operation<(), ()>>>,
}

impl<A, T> GuardedServiceBuilder<A, T> {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            breaker: BreakerConfig::default(),
            health_breaker: BreakerConfig::health_probe(),
            retry: RetryConfig::default(),
            enabled: true,
            scheduler: Arc::new(TokioScheduler),
            backoff_seed: None,
            operations: OperationRegistry::new(),
            probe: None,
        }
    }

    pub fn breaker_config(mut self, config: BreakerConfig) -> Self {
        self.breaker = config;
        self
    }

    pub fn health_config(mut self, config: BreakerConfig) -> Self {
        self.health_breaker = config;
        self
    }

    pub fn retry_config(mut self, config: RetryConfig) -> Self {
        self.retry = config;
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Timer source shared by both breakers.
    pub fn scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    /// Seed the backoff jitter RNG.
    pub fn backoff_seed(mut self, seed: u64) -> Self {
        self.backoff_seed = Some(seed);
        self
    }

    pub fn operation<O>(mut self, id: impl Into<String>, operation: O) -> Self
    where
        O: Operation<A, T> + 'static,
    {
        self.operations.register(id, operation);
        self
    }

    pub fn health_probe<O>(mut self, probe: O) -> Self
    where
        O: Operation<(), ()> + 'static,
    {
        self.probe = Some(Arc::new(probe));
        self
    }

    pub fn build(self) -> GuardedService<A, T> {
        let primary = CircuitBreaker::new(self.name.clone(), self.breaker, self.scheduler.clone());
        let health = CircuitBreaker::new(format!("{}:health", self.name), self.health_breaker, self.scheduler);
        primary.set_enabled(self.enabled);
        health.set_enabled(self.enabled);

        let backoff = match self.backoff_seed {
            Some(seed) => BackoffCalculator::with_seed(&self.retry, seed),
            None => BackoffCalculator::new(&self.retry),
        };

        tracing::info!(
            service = %self.name,
            operations = ?self.operations.ids(),
            health_probe = self.probe.is_some(),
            "Guarded service ready"
        );

        GuardedService {
            name: self.name,
            primary,
            health,
            operations: self.operations,
            probe: self.probe,
            backoff,
            max_retries: self.retry.max_retries,
        }
    }
}

impl<A, T> std::fmt::Debug for GuardedService<A, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardedService")
            .field("name", &self.name)
            .field("primary", &self.primary)
            .field("health", &self.health)
            .finish()
    }
}
