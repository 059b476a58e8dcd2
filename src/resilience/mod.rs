//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to the worker:
//!     → guard.rs (resolve operation id, optional retry loop)
//!     → circuit_breaker.rs (admission, outcome bookkeeping)
//!     → timeouts.rs (per-call deadline)
//!     → On retryable failure: retries.rs + backoff.rs
//! ```
//!
//! # Design Decisions
//! - Every downstream call has a deadline; a timeout counts as a failure
//! - Open circuits fail fast and are never retried
//! - Health probes run through their own breaker

pub mod backoff;
pub mod circuit_breaker;
pub mod error;
pub mod guard;
pub mod journal;
pub mod operations;
pub mod publisher;
pub mod registry;
pub mod retries;
pub mod scheduler;
pub mod state;
pub mod threshold;
pub mod timeouts;

use std::time::{SystemTime, UNIX_EPOCH};

pub use circuit_breaker::CircuitBreaker;
pub use error::{BreakerError, ControlError, DownstreamError};
pub use guard::{BreakerControl, GuardedService, HealthResult};
pub use journal::BreakerEvent;
pub use registry::MetricsSnapshot;
pub use state::CircuitState;

/// Wall-clock milliseconds since the Unix epoch.
pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}
