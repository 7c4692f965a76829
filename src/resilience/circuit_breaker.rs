//! Circuit breaker state.
//!
//! # States
//! - Closed: reads pass through
//! - Open: endpoint assumed down, reads fail fast until `resume_at`
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive failures >= failure_threshold
//! Open → (trial admitted): now >= resume_at, next real read goes through
//! trial succeeds → Closed
//! trial fails → Open with a fresh resume_at
//! ```
//!
//! # Design Decisions
//! - No background timer; admission is evaluated lazily on each attempt
//! - Admission is a pure function of (state, now) so it can be tested without real time
//! - Per-endpoint breaker, owned by the health tracker

use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;

/// Breaker status for one endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open { resume_at: Instant },
}

/// Externally visible breaker phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitPhase {
    Closed,
    Open,
    /// Open, but the recovery timeout has elapsed; the next read is a trial.
    HalfOpen,
}

impl CircuitState {
    /// Open with the recovery timeout counted from `now`.
    pub fn open_at(now: Instant, recovery_timeout: Duration) -> Self {
        CircuitState::Open {
            resume_at: now + recovery_timeout,
        }
    }

    /// Whether a real read may be attempted at `now`.
    pub fn admits(&self, now: Instant) -> bool {
        match self {
            CircuitState::Closed => true,
            CircuitState::Open { resume_at } => now >= *resume_at,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, CircuitState::Open { .. })
    }

    pub fn phase(&self, now: Instant) -> CircuitPhase {
        match self {
            CircuitState::Closed => CircuitPhase::Closed,
            CircuitState::Open { .. } if self.admits(now) => CircuitPhase::HalfOpen,
            CircuitState::Open { .. } => CircuitPhase::Open,
        }
    }

    /// Time left until a trial read is admitted.
    pub fn remaining(&self, now: Instant) -> Duration {
        match self {
            CircuitState::Closed => Duration::ZERO,
            CircuitState::Open { resume_at } => resume_at.saturating_duration_since(now),
        }
    }
}
