//! Exponential backoff with optional jitter.

use std::sync::Mutex;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::RetryConfig;

/// Jitter spread as a fraction of the computed delay (both directions).
const JITTER_FRACTION: f64 = 0.1;

/// Computes retry delays from the attempt number.
///
/// `delay(attempt) = min(initial * multiplier^attempt, max)`, optionally
/// perturbed by up to ±10% and clamped to `[0, max]`.
#[derive(Debug)]
pub struct BackoffCalculator {
    initial_delay_ms: u64,
    multiplier: f64,
    max_delay_ms: u64,
    jitter: bool,
    rng: Mutex<StdRng>,
}

impl BackoffCalculator {
    /// Create a calculator seeded from OS entropy.
    pub fn new(config: &RetryConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Create a calculator with a fixed seed, for reproducible jitter.
    pub fn with_seed(config: &RetryConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: &RetryConfig, rng: StdRng) -> Self {
        Self {
            initial_delay_ms: config.initial_delay_ms,
            multiplier: config.multiplier,
            max_delay_ms: config.max_delay_ms,
            jitter: config.jitter,
            rng: Mutex::new(rng),
        }
    }

    /// Upper bound for any delay this calculator returns.
    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    /// Delay before retry number `attempt` (0 for the first retry).
    pub fn delay(&self, attempt: u32) -> Duration {
        let capped = self.base_delay_ms(attempt);
        if !self.jitter || capped == 0.0 {
            return Duration::from_millis(capped as u64);
        }

        let spread = capped * JITTER_FRACTION;
        let offset = {
            let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            rng.gen_range(-spread..=spread)
        };
        let jittered = (capped + offset).clamp(0.0, self.max_delay_ms as f64);
        Duration::from_millis(jittered.round() as u64)
    }

    fn base_delay_ms(&self, attempt: u32) -> f64 {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let raw = self.initial_delay_ms as f64 * self.multiplier.powi(exponent);
        let max = self.max_delay_ms as f64;
        if raw.is_finite() {
            raw.clamp(0.0, max)
        } else {
            max
        }
    }
}
