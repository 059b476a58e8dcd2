//! Process lifecycle.
//!
//! ```text
//! SIGINT/SIGTERM (signals.rs)
//!     → Shutdown::trigger (shutdown.rs)
//!     → health monitor and admin listener exit
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::shutdown_signal;
