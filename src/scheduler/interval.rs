//! Randomized poll intervals.
//!
//! Each interval is `base ± uniform(range)` clamped to `[min, max]`, so
//! independent pollers hitting the same remote endpoint drift apart instead
//! of phase-locking.

use rand::Rng;
use std::time::Duration;

use crate::config::schema::secs;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntervalSettings {
    pub base_secs: f64,
    pub jitter_range_secs: f64,
    pub min_secs: f64,
    pub max_secs: f64,
}

impl IntervalSettings {
    pub fn next_interval(&self) -> Duration {
        self.next_interval_with(&mut rand::thread_rng())
    }

    pub fn next_interval_with<R: Rng>(&self, rng: &mut R) -> Duration {
        secs(self.next_secs_with(rng))
    }

    /// Interval in fractional seconds.
    pub fn next_secs_with<R: Rng>(&self, rng: &mut R) -> f64 {
        let range = self.jitter_range_secs.abs();
        let variation = if range > 0.0 {
            rng.gen_range(-range..=range)
        } else {
            0.0
        };
        (self.base_secs + variation).clamp(self.min_secs, self.max_secs.max(self.min_secs))
    }
}
