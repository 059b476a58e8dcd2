//! One-shot timer capability injected into breakers.
//!
//! Production code uses [`TokioScheduler`]; tests that need to control
//! exactly when a reset timer fires use [`ManualScheduler`].

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::AbortHandle;

/// Deferred work handed to a scheduler.
pub type TimerTask = Box<dyn FnOnce() + Send + 'static>;

/// Schedules a task to run once after a delay.
pub trait Scheduler: Send + Sync {
    fn after(&self, delay: Duration, task: TimerTask) -> TimerHandle;
}

/// Cancels a scheduled task. Dropping the handle does not cancel it.
pub struct TimerHandle {
    cancelled: Arc<AtomicBool>,
    abort: Option<AbortHandle>,
}

impl TimerHandle {
    fn new(cancelled: Arc<AtomicBool>, abort: Option<AbortHandle>) -> Self {
        Self { cancelled, abort }
    }

    /// Prevent the task from running if it has not run yet.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if let Some(abort) = &self.abort {
            abort.abort();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerHandle")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Runs tasks on the ambient Tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    fn after(&self, delay: Duration, task: TimerTask) -> TimerHandle {
        let cancelled = Arc::new(AtomicBool::new(false));
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                // The breaker still moves to half-open lazily on the next call.
                tracing::warn!(delay = ?delay, "No Tokio runtime available, timer not scheduled");
                return TimerHandle::new(cancelled, None);
            }
        };

        let flag = cancelled.clone();
        let join = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if !flag.load(Ordering::SeqCst) {
                task();
            }
        });
        TimerHandle::new(cancelled, Some(join.abort_handle()))
    }
}

struct PendingTask {
    due: Duration,
    cancelled: Arc<AtomicBool>,
    task: TimerTask,
}

/// Virtual-time scheduler. Tasks run only when [`ManualScheduler::advance`]
/// moves the clock past their deadline.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    inner: Arc<Mutex<ManualState>>,
}

#[derive(Default)]
struct ManualState {
    now: Duration,
    pending: Vec<PendingTask>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of scheduled tasks that are neither fired nor cancelled.
    pub fn pending(&self) -> usize {
        let state = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        state
            .pending
            .iter()
            .filter(|p| !p.cancelled.load(Ordering::SeqCst))
            .count()
    }

    /// Move virtual time forward and run every due, uncancelled task.
    ///
    /// Tasks run after the internal lock is released, so they may schedule
    /// new timers.
    pub fn advance(&self, by: Duration) -> usize {
        let due = {
            let mut state = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            state.now += by;
            let now = state.now;
            let (due, rest): (Vec<_>, Vec<_>) =
                state.pending.drain(..).partition(|p| p.due <= now);
            state.pending = rest;
            due
        };

        let mut fired = 0;
        for pending in due {
            if !pending.cancelled.load(Ordering::SeqCst) {
                (pending.task)();
                fired += 1;
            }
        }
        fired
    }
}

impl Scheduler for ManualScheduler {
    fn after(&self, delay: Duration, task: TimerTask) -> TimerHandle {
        let cancelled = Arc::new(AtomicBool::new(false));
        let mut state = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let due = state.now + delay;
        state.pending.push(PendingTask {
            due,
            cancelled: cancelled.clone(),
            task,
        });
        TimerHandle::new(cancelled, None)
    }
}

impl fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("pending", &self.pending())
            .finish()
    }
}
