//! Endpoint health tracking and breaker transitions.

use std::sync::Arc;
use std::time::Duration;

use crate::endpoint::{Endpoint, EndpointId};
use crate::events::{EventHub, MonitorEvent};
use crate::health::state::{EndpointHealth, HealthSnapshot};
use crate::observability::metrics;
use crate::reader::types::unix_millis;
use crate::resilience::circuit_breaker::CircuitState;
use crate::resilience::clock::Clock;

/// Breaker thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerSettings {
    pub failure_threshold: u32,
    pub recovery_timeout: Duration,
    pub latency_window: usize,
}

/// Health state for both endpoints of a monitor.
///
/// Mutated only from the scheduler task, so no interior locking.
#[derive(Debug)]
pub struct HealthTracker {
    health: [EndpointHealth; 2],
    settings: BreakerSettings,
    clock: Arc<dyn Clock>,
    events: EventHub,
}

impl HealthTracker {
    pub fn new(
        primary: Endpoint,
        secondary: Endpoint,
        settings: BreakerSettings,
        clock: Arc<dyn Clock>,
        events: EventHub,
    ) -> Self {
        Self {
            health: [
                EndpointHealth::new(primary, settings.latency_window),
                EndpointHealth::new(secondary, settings.latency_window),
            ],
            settings,
            clock,
            events,
        }
    }

    pub fn endpoint(&self, id: EndpointId) -> &Endpoint {
        &self.health[id.index()].endpoint
    }

    pub fn health(&self, id: EndpointId) -> &EndpointHealth {
        &self.health[id.index()]
    }

    /// True if the circuit is closed, or open with the recovery timeout
    /// elapsed. In the latter case the caller's next real read is the trial.
    pub fn is_callable(&self, id: EndpointId) -> bool {
        self.health[id.index()].circuit.admits(self.clock.now())
    }

    pub fn record_success(&mut self, id: EndpointId, latency_ms: f64) {
        let health = &mut self.health[id.index()];
        health.consecutive_failures = 0;
        health.total_successes += 1;
        health.last_success_at = Some(unix_millis());
        health.latency.push(latency_ms);

        if health.circuit.is_open() {
            health.circuit = CircuitState::Closed;
            tracing::info!(
                endpoint = %id,
                address = %health.endpoint.address(),
                "Circuit breaker closed"
            );
            metrics::record_circuit_state(id, false);
        }
    }

    /// Count a failed logical read. Returns true if this failure opened the
    /// circuit (including a re-open after a failed trial read).
    pub fn record_failure(&mut self, id: EndpointId) -> bool {
        let now = self.clock.now();
        let threshold = self.settings.failure_threshold;
        let recovery = self.settings.recovery_timeout;

        let health = &mut self.health[id.index()];
        health.consecutive_failures = health.consecutive_failures.saturating_add(1);
        health.total_failures += 1;
        health.last_failure_at = Some(unix_millis());

        if health.consecutive_failures < threshold {
            return false;
        }

        let reopening = match health.circuit {
            CircuitState::Closed => false,
            // Still inside the open window: nothing new to report.
            CircuitState::Open { .. } if !health.circuit.admits(now) => return false,
            CircuitState::Open { .. } => true,
        };

        health.circuit = CircuitState::open_at(now, recovery);
        let failures = health.consecutive_failures;
        let address = health.endpoint.address();

        if reopening {
            tracing::warn!(
                endpoint = %id,
                address = %address,
                failures,
                retry_in_secs = recovery.as_secs_f64(),
                "Trial read failed, circuit breaker re-opened"
            );
        } else {
            tracing::warn!(
                endpoint = %id,
                address = %address,
                failures,
                retry_in_secs = recovery.as_secs_f64(),
                "Circuit breaker opened"
            );
        }
        metrics::record_circuit_state(id, true);

        self.events.emit(&MonitorEvent::CircuitOpened {
            endpoint: id,
            address,
            failures,
        });
        true
    }

    pub fn snapshot(&self, id: EndpointId) -> HealthSnapshot {
        self.health[id.index()].snapshot(self.clock.now())
    }
}
