//! Timeout enforcement.
//!
//! The deadline drops the downstream future, so a call that completes after
//! its timeout can never report an outcome.

use std::future::Future;
use std::time::Duration;

use crate::resilience::error::{BreakerError, DownstreamError};

/// Run `call` under a deadline, mapping both failure kinds to `BreakerError`.
pub async fn with_deadline<T, Fut>(timeout: Duration, call: Fut) -> Result<T, BreakerError>
where
    Fut: Future<Output = Result<T, DownstreamError>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(BreakerError::Downstream(e)),
        Err(_) => Err(BreakerError::Timeout {
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }),
    }
}
