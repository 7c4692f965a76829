//! Retrying reader.
//!
//! # Responsibilities
//! - Short-circuit reads on an open breaker (no I/O, no retry budget)
//! - Execute up to `max_retries + 1` reads with jittered exponential backoff
//! - Feed the final result of a logical read back into the health tracker
//!
//! # Design Decisions
//! - Only the final attempt of a logical read counts toward the breaker
//! - Every attempt is bounded by the read timeout
//! - Backoff sleeps are not interrupted by shutdown; the in-flight read
//!   finishes within its own bounds

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::endpoint::EndpointId;
use crate::health::HealthTracker;
use crate::observability::metrics;
use crate::reader::{PollOutcome, ReadError, ValueReader};
use crate::resilience::backoff::BackoffPolicy;
use crate::resilience::timeouts::with_read_timeout;

/// Retry settings for one logical read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub read_timeout: Duration,
    pub backoff: BackoffPolicy,
}

/// Executes logical reads against one endpoint at a time.
#[derive(Debug)]
pub struct RetryingReader<R> {
    reader: Arc<R>,
    tracker: HealthTracker,
    policy: RetryPolicy,
    register: u16,
}

impl<R: ValueReader> RetryingReader<R> {
    pub fn new(reader: Arc<R>, tracker: HealthTracker, policy: RetryPolicy, register: u16) -> Self {
        Self {
            reader,
            tracker,
            policy,
            register,
        }
    }

    pub fn tracker(&self) -> &HealthTracker {
        &self.tracker
    }

    /// One logical read against `id`. Never fails: every path ends in an outcome.
    pub async fn attempt(&mut self, id: EndpointId) -> PollOutcome {
        let endpoint = self.tracker.endpoint(id).clone();
        let address = endpoint.address();

        if !self.tracker.is_callable(id) {
            tracing::debug!(endpoint = %id, address = %address, "Circuit open, skipping read");
            return PollOutcome::circuit_open(id, address, self.register);
        }

        if self.tracker.health(id).circuit.is_open() {
            tracing::info!(endpoint = %id, address = %address, "Recovery timeout elapsed, trying endpoint again");
        }

        let mut attempt = 0;
        loop {
            let started = Instant::now();
            let result = with_read_timeout(
                self.policy.read_timeout,
                self.reader.read_value(&endpoint, self.register),
            )
            .await;
            let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

            match result {
                Ok(value) => {
                    self.tracker.record_success(id, latency_ms);
                    return PollOutcome::success(id, address, self.register, value, latency_ms, attempt);
                }
                Err(error) if attempt >= self.policy.max_retries => {
                    self.tracker.record_failure(id);
                    return self.exhausted(id, address, &error, latency_ms, attempt);
                }
                Err(error) => {
                    let delay = self.policy.backoff.delay_for(attempt);
                    tracing::debug!(
                        endpoint = %id,
                        address = %address,
                        attempt = attempt + 1,
                        max_retries = self.policy.max_retries,
                        error = %error,
                        delay = ?delay,
                        "Read failed, retrying"
                    );
                    metrics::record_retry(id);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    fn exhausted(
        &self,
        id: EndpointId,
        address: String,
        error: &ReadError,
        latency_ms: f64,
        attempt: u32,
    ) -> PollOutcome {
        tracing::warn!(
            endpoint = %id,
            address = %address,
            retries = attempt,
            error = %error,
            "Read failed after all retries"
        );
        PollOutcome::failure(id, address, self.register, error, latency_ms, attempt)
    }
}
