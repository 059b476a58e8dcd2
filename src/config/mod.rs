//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse, apply env overrides)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → BreakerConfig handed to each breaker at construction
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; breakers never read the environment
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AdminConfig, BreakerConfig, GatewayConfig, HealthCheckConfig, ObservabilityConfig,
    RetryConfig, WorkerConfig,
};
