//! Circuit breaker for downstream protection.
//!
//! # State Transitions
//! ```text
//! Closed   → Open:     threshold evaluator signals a trip
//! Open     → HalfOpen: reset timeout elapsed (timer or lazy check on call)
//! HalfOpen → Closed:   the single probe call succeeds
//! HalfOpen → Open:     the probe call fails
//! any      → Open:     manual trip
//! any      → Closed:   manual reset
//! ```
//!
//! Metrics start a new window on entry into HalfOpen (and on manual reset),
//! never on HalfOpen → Closed.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use tokio::time::Instant;

use crate::config::BreakerConfig;
use crate::observability::metrics::{self, CallOutcome};
use crate::resilience::error::{validate_reason, BreakerError, ControlError, DownstreamError};
use crate::resilience::journal::{BreakerEvent, EventJournal};
use crate::resilience::publisher::{EventSubscriber, Publisher};
use crate::resilience::registry::{MetricsRegistry, MetricsSnapshot};
use crate::resilience::scheduler::{Scheduler, TimerHandle, TokioScheduler};
use crate::resilience::threshold;
use crate::resilience::timeouts::with_deadline;
use crate::resilience::{now_millis, CircuitState};

/// State guarded by the breaker's single lock.
struct Inner {
    state: CircuitState,
    metrics: MetricsRegistry,
    journal: EventJournal,
    /// Bumped on every transition; outcomes from older epochs cannot move the state.
    epoch: u64,
    opened_at: Option<Instant>,
    last_failure_at: Option<Instant>,
    probe_in_flight: bool,
    reset_timer: Option<TimerHandle>,
}

/// One closed/open/half-open state machine guarding a downstream dependency.
///
/// Shared behind `Arc` and safe to call from many tasks at once. The lock is
/// only held for bookkeeping, never across the downstream call.
pub struct CircuitBreaker {
    name: String,
    config: BreakerConfig,
    enabled: AtomicBool,
    inner: Mutex<Inner>,
    publisher: Publisher,
    scheduler: Arc<dyn Scheduler>,
    this: Weak<CircuitBreaker>,
}

impl CircuitBreaker {
    /// Create a breaker in the Closed state.
    pub fn new(
        name: impl Into<String>,
        config: BreakerConfig,
        scheduler: Arc<dyn Scheduler>,
    ) -> Arc<Self> {
        let name = name.into();
        let breaker = Arc::new_cyclic(|this| Self {
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                metrics: MetricsRegistry::new(now_millis()),
                journal: EventJournal::new(config.max_events_in_history),
                epoch: 0,
                opened_at: None,
                last_failure_at: None,
                probe_in_flight: false,
                reset_timer: None,
            }),
            name,
            config,
            enabled: AtomicBool::new(true),
            publisher: Publisher::new(),
            scheduler,
            this: this.clone(),
        });
        metrics::register_breaker(&breaker.name, CircuitState::Closed);
        breaker
    }

    /// Create a breaker whose reset timers run on the Tokio runtime.
    pub fn with_tokio(name: impl Into<String>, config: BreakerConfig) -> Arc<Self> {
        Self::new(name, config, Arc::new(TokioScheduler))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &BreakerConfig {
        &self.config
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Toggle the global bypass. A disabled breaker forwards every call.
    pub fn set_enabled(&self, enabled: bool) {
        let previous = self.enabled.swap(enabled, Ordering::SeqCst);
        if previous != enabled {
            tracing::info!(breaker = %self.name, enabled, "Circuit breaker bypass toggled");
        }
    }

    pub fn subscribe(&self, subscriber: Arc<dyn EventSubscriber>) {
        self.publisher.subscribe(subscriber);
    }

    /// Point-in-time copy of counters, derived rates and state.
    pub fn metrics(&self) -> MetricsSnapshot {
        let inner = self.lock();
        MetricsSnapshot::capture(&self.name, inner.state, self.is_enabled(), &inner.metrics, now_millis())
    }

    /// Full event history, oldest first.
    pub fn events(&self) -> Vec<BreakerEvent> {
        self.lock().journal.snapshot()
    }

    /// The last `limit` events plus the number currently held.
    pub fn recent_events(&self, limit: usize) -> (Vec<BreakerEvent>, usize) {
        let inner = self.lock();
        (inner.journal.recent(limit), inner.journal.len())
    }

    /// Run a downstream call through the breaker.
    ///
    /// `call` is only invoked once the breaker admits the request, so a
    /// rejected call never reaches the downstream.
    pub async fn execute<T, F, Fut>(&self, call: F) -> Result<T, BreakerError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, DownstreamError>>,
    {
        let timeout = Duration::from_millis(self.config.call_timeout_ms);
        if !self.is_enabled() {
            return with_deadline(timeout, call()).await;
        }

        let mut permit = self.acquire()?;
        let started = Instant::now();
        let result = with_deadline(timeout, call()).await;
        let elapsed = started.elapsed();

        match &result {
            Ok(_) => self.on_success(&mut permit, elapsed),
            Err(err) => self.on_failure(&mut permit, elapsed, err),
        }
        result
    }

    /// Force the circuit open. Legal from any state.
    pub fn trip(&self, reason: &str) -> Result<CircuitState, ControlError> {
        let reason = validate_reason(reason)?;
        let mut inner = self.lock();
        let previous = inner.state;

        self.enter(&mut inner, CircuitState::Open);
        tracing::warn!(breaker = %self.name, %previous, reason = %reason, "Circuit manually tripped");
        self.emit(
            &mut inner,
            BreakerEvent::ManualTrip {
                reason,
                timestamp: now_millis(),
            },
        );
        self.export(&inner);
        Ok(inner.state)
    }

    /// Force the circuit closed and start a fresh metrics window.
    pub fn reset(&self, reason: &str) -> Result<CircuitState, ControlError> {
        let reason = validate_reason(reason)?;
        let mut inner = self.lock();
        let previous = inner.state;

        self.enter(&mut inner, CircuitState::Closed);
        inner.metrics.reset_window();
        tracing::info!(breaker = %self.name, %previous, reason = %reason, "Circuit manually reset");
        self.emit(
            &mut inner,
            BreakerEvent::ManualReset {
                reason,
                timestamp: now_millis(),
            },
        );
        self.export(&inner);
        Ok(inner.state)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Admission control: decide whether this call may reach the downstream.
    fn acquire(&self) -> Result<CallPermit<'_>, BreakerError> {
        let mut inner = self.lock();
        let state = inner.state;
        match state {
            CircuitState::Closed => Ok(CallPermit::new(self, inner.epoch, false)),
            CircuitState::Open if self.reset_elapsed(&inner) => {
                self.transition(&mut inner, CircuitState::HalfOpen, "reset timeout elapsed".to_string());
                inner.probe_in_flight = true;
                self.export(&inner);
                Ok(CallPermit::new(self, inner.epoch, true))
            }
            CircuitState::Open => Err(self.reject(&mut inner, "circuit open")),
            CircuitState::HalfOpen if inner.probe_in_flight => {
                Err(self.reject(&mut inner, "half-open probe in flight"))
            }
            CircuitState::HalfOpen => {
                inner.probe_in_flight = true;
                Ok(CallPermit::new(self, inner.epoch, true))
            }
        }
    }

    fn reset_elapsed(&self, inner: &Inner) -> bool {
        let since = match (inner.opened_at, inner.last_failure_at) {
            (Some(opened), Some(failed)) => opened.max(failed),
            (Some(opened), None) => opened,
            (None, Some(failed)) => failed,
            (None, None) => return true,
        };
        Instant::now().saturating_duration_since(since) >= Duration::from_millis(self.config.reset_timeout_ms)
    }

    fn reject(&self, inner: &mut Inner, reason: &str) -> BreakerError {
        tracing::debug!(breaker = %self.name, reason, "Call rejected");
        self.emit(
            inner,
            BreakerEvent::CallRejected {
                reason: reason.to_string(),
                timestamp: now_millis(),
            },
        );
        BreakerError::Open {
            breaker: self.name.clone(),
        }
    }

    fn on_success(&self, permit: &mut CallPermit<'_>, elapsed: Duration) {
        let slow = elapsed > Duration::from_millis(self.config.slow_call_duration_threshold_ms);
        let now = now_millis();
        let mut inner = self.lock();

        inner.metrics.record_success(slow, now);
        metrics::record_call(&self.name, CallOutcome::Success { slow });
        self.emit(
            &mut inner,
            BreakerEvent::CallSuccess {
                duration_ms: duration_millis(elapsed),
                slow,
                timestamp: now,
            },
        );

        if permit.epoch == inner.epoch {
            let state = inner.state;
            match state {
                CircuitState::HalfOpen if permit.probe => {
                    self.transition(&mut inner, CircuitState::Closed, "half-open probe succeeded".to_string());
                }
                CircuitState::Closed => self.evaluate(&mut inner),
                _ => {}
            }
        }
        permit.completed = true;
        self.export(&inner);
    }

    fn on_failure(&self, permit: &mut CallPermit<'_>, elapsed: Duration, err: &BreakerError) {
        let now = now_millis();
        let mut inner = self.lock();

        inner.metrics.record_failure(now);
        metrics::record_call(&self.name, CallOutcome::Failure);
        inner.last_failure_at = Some(Instant::now());
        self.emit(
            &mut inner,
            BreakerEvent::CallFailure {
                reason: err.to_string(),
                duration_ms: duration_millis(elapsed),
                timestamp: now,
            },
        );

        if permit.epoch == inner.epoch {
            let state = inner.state;
            match state {
                CircuitState::HalfOpen if permit.probe => {
                    self.transition(&mut inner, CircuitState::Open, format!("half-open probe failed: {err}"));
                }
                CircuitState::Closed => self.evaluate(&mut inner),
                _ => {}
            }
        }
        permit.completed = true;
        self.export(&inner);
    }

    fn evaluate(&self, inner: &mut Inner) {
        if let Some(reason) = threshold::evaluate(&inner.metrics, &self.config) {
            self.transition(inner, CircuitState::Open, reason.to_string());
        }
    }

    /// Threshold- or timer-driven transition; journals a `StateChange`.
    fn transition(&self, inner: &mut Inner, next: CircuitState, reason: String) {
        let previous = inner.state;
        self.enter(inner, next);
        if next == CircuitState::HalfOpen {
            inner.metrics.reset_window();
        }

        match next {
            CircuitState::Open => {
                tracing::warn!(breaker = %self.name, %previous, %next, reason = %reason, "Circuit opened")
            }
            _ => tracing::info!(breaker = %self.name, %previous, %next, reason = %reason, "Circuit state changed"),
        }
        self.emit(
            inner,
            BreakerEvent::StateChange {
                previous,
                next,
                reason,
                timestamp: now_millis(),
            },
        );
    }

    /// Bookkeeping shared by every way of entering a state.
    fn enter(&self, inner: &mut Inner, next: CircuitState) {
        inner.state = next;
        inner.epoch += 1;
        inner.probe_in_flight = false;
        inner.metrics.record_transition();
        metrics::record_transition(&self.name);
        if let Some(timer) = inner.reset_timer.take() {
            timer.cancel();
        }

        match next {
            CircuitState::Open => {
                inner.opened_at = Some(Instant::now());
                self.schedule_reset(inner);
            }
            CircuitState::HalfOpen | CircuitState::Closed => inner.opened_at = None,
        }
    }

    fn schedule_reset(&self, inner: &mut Inner) {
        let epoch = inner.epoch;
        let this = self.this.clone();
        let handle = self.scheduler.after(
            Duration::from_millis(self.config.reset_timeout_ms),
            Box::new(move || {
                if let Some(breaker) = this.upgrade() {
                    breaker.on_reset_timer(epoch);
                }
            }),
        );
        inner.reset_timer = Some(handle);
    }

    fn on_reset_timer(&self, epoch: u64) {
        let mut inner = self.lock();
        if inner.state != CircuitState::Open || inner.epoch != epoch {
            return;
        }
        // This timer is the one firing; nothing left to cancel.
        inner.reset_timer = None;
        self.transition(&mut inner, CircuitState::HalfOpen, "reset timeout elapsed".to_string());
        self.export(&inner);
    }

    fn emit(&self, inner: &mut Inner, event: BreakerEvent) {
        self.publisher.publish(&self.name, &event);
        inner.journal.push(event);
    }

    fn export(&self, inner: &Inner) {
        metrics::record_state(&self.name, inner.state);
    }
}

impl Drop for CircuitBreaker {
    fn drop(&mut self) {
        let inner = self.inner.get_mut().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(timer) = inner.reset_timer.take() {
            timer.cancel();
        }
    }
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("state", &self.state())
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

/// Admission ticket for one call.
///
/// Dropping an unfinished half-open probe (e.g. the caller's future was
/// cancelled) frees the probe slot so the breaker cannot wedge.
struct CallPermit<'a> {
    breaker: &'a CircuitBreaker,
    epoch: u64,
    probe: bool,
    completed: bool,
}

impl<'a> CallPermit<'a> {
    fn new(breaker: &'a CircuitBreaker, epoch: u64, probe: bool) -> Self {
        Self {
            breaker,
            epoch,
            probe,
            completed: false,
        }
    }
}

impl Drop for CallPermit<'_> {
    fn drop(&mut self) {
        if self.completed || !self.probe {
            return;
        }
        let mut inner = self.breaker.lock();
        if inner.epoch == self.epoch && inner.state == CircuitState::HalfOpen {
            inner.probe_in_flight = false;
        }
    }
}

fn duration_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
