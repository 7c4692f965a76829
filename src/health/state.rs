//! Per-endpoint health record.
//!
//! # Invariants
//! - `circuit` is Open only while `consecutive_failures >= failure_threshold`
//! - Open → Closed only as a side effect of a real read after `resume_at`
//! - The latency window holds successful reads only

use serde::Serialize;
use std::collections::VecDeque;
use tokio::time::Instant;

use crate::endpoint::{Endpoint, EndpointId};
use crate::resilience::circuit_breaker::{CircuitPhase, CircuitState};

/// Bounded ring buffer of recent successful latencies (milliseconds).
#[derive(Debug, Clone)]
pub struct LatencyWindow {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl LatencyWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, latency_ms: f64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(latency_ms);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Mean of the window, 0 when empty.
    pub fn average(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }
}

/// Mutable health state of one endpoint. Owned by the health tracker.
#[derive(Debug, Clone)]
pub struct EndpointHealth {
    pub endpoint: Endpoint,
    pub consecutive_failures: u32,
    pub total_failures: u64,
    pub total_successes: u64,
    pub circuit: CircuitState,
    pub latency: LatencyWindow,
    /// Unix milliseconds.
    pub last_success_at: Option<u64>,
    /// Unix milliseconds.
    pub last_failure_at: Option<u64>,
}

impl EndpointHealth {
    pub fn new(endpoint: Endpoint, window: usize) -> Self {
        Self {
            endpoint,
            consecutive_failures: 0,
            total_failures: 0,
            total_successes: 0,
            circuit: CircuitState::Closed,
            latency: LatencyWindow::new(window),
            last_success_at: None,
            last_failure_at: None,
        }
    }

    pub fn average_latency_ms(&self) -> f64 {
        self.latency.average()
    }

    pub fn snapshot(&self, now: Instant) -> HealthSnapshot {
        let circuit = self.circuit.phase(now);
        HealthSnapshot {
            endpoint: self.endpoint.id,
            address: self.endpoint.address(),
            available: circuit == CircuitPhase::Closed,
            circuit,
            reopens_in_secs: match circuit {
                CircuitPhase::Open => Some(self.circuit.remaining(now).as_secs_f64()),
                _ => None,
            },
            consecutive_failures: self.consecutive_failures,
            total_failures: self.total_failures,
            total_successes: self.total_successes,
            average_latency_ms: self.average_latency_ms(),
            latency_samples: self.latency.len(),
            last_success_at: self.last_success_at,
            last_failure_at: self.last_failure_at,
        }
    }
}

/// Read-only copy of an [`EndpointHealth`] for external callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthSnapshot {
    pub endpoint: EndpointId,
    pub address: String,
    pub available: bool,
    pub circuit: CircuitPhase,
    pub reopens_in_secs: Option<f64>,
    pub consecutive_failures: u32,
    pub total_failures: u64,
    pub total_successes: u64,
    pub average_latency_ms: f64,
    pub latency_samples: usize,
    pub last_success_at: Option<u64>,
    pub last_failure_at: Option<u64>,
}

impl HealthSnapshot {
    /// Snapshot of an endpoint that has not been polled yet.
    pub fn fresh(endpoint: &Endpoint) -> Self {
        EndpointHealth::new(endpoint.clone(), 1).snapshot(Instant::now())
    }
}
