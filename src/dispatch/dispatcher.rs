//! Access strategy dispatcher.

use serde::Serialize;

use crate::dispatch::mode::AccessMode;
use crate::endpoint::EndpointId;
use crate::events::{EventHub, MonitorEvent};
use crate::health::HealthTracker;
use crate::observability::metrics;
use crate::reader::{PollOutcome, ValueReader};
use crate::resilience::retries::RetryingReader;

/// Switch counters maintained by the dispatcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchCounters {
    pub fallback_switches: u64,
    pub alternating_switches: u64,
    pub both_mode_runs: u64,
}

/// Chooses endpoints per poll according to the access mode.
#[derive(Debug)]
pub struct Dispatcher<R> {
    mode: AccessMode,
    reader: RetryingReader<R>,
    alternation_counter: u64,
    counters: DispatchCounters,
    events: EventHub,
}

impl<R: ValueReader> Dispatcher<R> {
    pub fn new(mode: AccessMode, reader: RetryingReader<R>, events: EventHub) -> Self {
        Self {
            mode,
            reader,
            alternation_counter: 0,
            counters: DispatchCounters::default(),
            events,
        }
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    pub fn counters(&self) -> DispatchCounters {
        self.counters
    }

    /// Continue counting from a previous engine's totals.
    pub fn restore_counters(&mut self, counters: DispatchCounters) {
        self.counters = counters;
    }

    pub fn tracker(&self) -> &HealthTracker {
        self.reader.tracker()
    }

    /// Run one poll cycle and return its authoritative outcome.
    pub async fn poll(&mut self) -> PollOutcome {
        match self.mode {
            AccessMode::Fallback => self.poll_fallback().await,
            AccessMode::Alternating => self.poll_alternating().await,
            AccessMode::Both => self.poll_both().await,
            AccessMode::PrimaryOnly => self.reader.attempt(EndpointId::Primary).await,
            AccessMode::SecondaryOnly => self.reader.attempt(EndpointId::Secondary).await,
        }
    }

    async fn poll_fallback(&mut self) -> PollOutcome {
        let primary = self.reader.attempt(EndpointId::Primary).await;
        if primary.success {
            return primary;
        }

        tracing::warn!(reason = %primary.reason(), "Primary endpoint failed, trying secondary");
        let secondary = self.reader.attempt(EndpointId::Secondary).await;
        if secondary.success {
            self.counters.fallback_switches += 1;
            self.announce_switch(EndpointId::Primary, EndpointId::Secondary, &primary);
            return secondary;
        }

        log_double_failure(&primary, &secondary);
        primary
    }

    async fn poll_alternating(&mut self) -> PollOutcome {
        let start = if self.alternation_counter % 2 == 0 {
            EndpointId::Primary
        } else {
            EndpointId::Secondary
        };
        self.alternation_counter += 1;

        let first = self.reader.attempt(start).await;
        if first.success {
            return first;
        }

        let other = start.other();
        tracing::warn!(from = %start, to = %other, reason = %first.reason(), "Endpoint failed, trying the other one");
        let second = self.reader.attempt(other).await;
        if second.success {
            self.counters.alternating_switches += 1;
            self.announce_switch(start, other, &first);
            return second;
        }

        log_double_failure(&first, &second);
        first
    }

    async fn poll_both(&mut self) -> PollOutcome {
        self.counters.both_mode_runs += 1;

        let primary = self.reader.attempt(EndpointId::Primary).await;
        let secondary = self.reader.attempt(EndpointId::Secondary).await;

        tracing::debug!(
            primary_ok = primary.success,
            primary_ms = ?primary.latency_ms,
            secondary_ok = secondary.success,
            secondary_ms = ?secondary.latency_ms,
            "Both endpoints polled"
        );

        match (primary.success, secondary.success) {
            (true, true) => {
                let p = primary.latency_ms.unwrap_or(f64::INFINITY);
                let s = secondary.latency_ms.unwrap_or(f64::INFINITY);
                // Ties go to the primary.
                if s < p {
                    secondary
                } else {
                    primary
                }
            }
            (true, false) => primary,
            (false, true) => secondary,
            (false, false) => {
                log_double_failure(&primary, &secondary);
                primary
            }
        }
    }

    fn announce_switch(&self, from: EndpointId, to: EndpointId, failed: &PollOutcome) {
        tracing::info!(from = %from, to = %to, "Switched endpoint for this poll");
        metrics::record_fallback(from, to);
        self.events.emit(&MonitorEvent::Fallback {
            from,
            to,
            reason: failed.reason(),
        });
    }
}

fn log_double_failure(first: &PollOutcome, second: &PollOutcome) {
    tracing::error!(
        first = %first.endpoint,
        first_error = %first.reason(),
        second = %second.endpoint,
        second_error = %second.reason(),
        "Both endpoints failed"
    );
}
