//! Retry logic.
//!
//! # Design Decisions
//! - Only `Timeout` and `Downstream` failures are retried
//! - `Open` fails fast: nothing can succeed before the reset timeout
//! - `NotConfigured` and `InvalidRequest` are caller errors and fail at once
//! - The error of the final attempt is returned verbatim

use std::future::Future;

use crate::resilience::backoff::BackoffCalculator;
use crate::resilience::error::BreakerError;

/// Run `attempt` up to `1 + max_retries` times, sleeping between tries.
///
/// The closure receives the zero-based attempt number.
pub async fn retry_with_backoff<T, F, Fut>(
    backoff: &BackoffCalculator,
    max_retries: u32,
    mut attempt: F,
) -> Result<T, BreakerError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, BreakerError>>,
{
    let mut tries = 0;
    loop {
        let err = match attempt(tries).await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !err.is_retryable() || tries >= max_retries {
            return Err(err);
        }

        let delay = backoff.delay(tries);
        tracing::info!(attempt = tries + 1, delay = ?delay, error = %err, "Retrying call");
        tokio::time::sleep(delay).await;
        tries += 1;
    }
}
