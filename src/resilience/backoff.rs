//! Exponential backoff with jitter.

use rand::Rng;
use std::time::Duration;

/// Maximum jitter as a fraction of the capped delay.
pub const JITTER_FACTOR: f64 = 0.2;

/// Retry delay settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub exponential: bool,
}

impl BackoffPolicy {
    /// Delay before the retry following failed attempt `attempt` (0-based),
    /// without jitter: `min(base * 2^attempt, max)`, or `min(base, max)` when
    /// exponential backoff is off.
    pub fn base_delay_for(&self, attempt: u32) -> Duration {
        let delay = if self.exponential {
            let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
            self.base_delay.saturating_mul(factor)
        } else {
            self.base_delay
        };
        delay.min(self.max_delay)
    }

    /// Jittered delay using the thread-local RNG.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.delay_with(attempt, &mut rand::thread_rng())
    }

    /// Jittered delay: the capped delay plus up to 20% on top. Jitter is only
    /// ever added so retries never fire earlier than the backoff schedule.
    pub fn delay_with<R: Rng>(&self, attempt: u32, rng: &mut R) -> Duration {
        let capped = self.base_delay_for(attempt);
        if capped.is_zero() {
            return capped;
        }
        let jitter = capped.mul_f64(rng.gen_range(0.0..=JITTER_FACTOR));
        capped + jitter
    }
}
