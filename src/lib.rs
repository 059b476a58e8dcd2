//! Resilience gateway for the AI worker.
//!
//! Guards calls to the speech/moderation worker with a circuit breaker,
//! bounded retries and an isolated health probe, and exposes an
//! authenticated control surface for operators.

pub mod admin;
pub mod config;
pub mod health;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod worker;

pub use config::GatewayConfig;
pub use lifecycle::Shutdown;
pub use resilience::{CircuitBreaker, GuardedService};
pub use worker::WorkerService;
