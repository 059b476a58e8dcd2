//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Breakers produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (gauges/counters per protected service)
//!
//! Consumers:
//!     → stdout log aggregation
//!     → GET /metrics on the admin listener (Prometheus scrape)
//! ```

pub mod logging;
pub mod metrics;
