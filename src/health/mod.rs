//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Periodic timer (active.rs)
//!     → GuardedService::check_health()
//!     → health breaker (isolated from the primary)
//!     → log degraded results
//! ```

pub mod active;

pub use active::HealthMonitor;
