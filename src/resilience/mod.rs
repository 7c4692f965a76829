//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher asks for one logical read on an endpoint:
//!     → circuit_breaker.rs (admission via HealthTracker, lazy trial read)
//!     → timeouts.rs (every read has a deadline)
//!     → On failure: retries.rs (retry with backoff.rs delays)
//!     → Final outcome recorded against the endpoint's health
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external read has a deadline
//! - Only the final failure of a logical read counts toward the breaker
//! - No breaker timer: the next admitted read after recovery is the trial
//! - Time comes from an injected `Clock` so breaker logic is testable

pub mod backoff;
pub mod circuit_breaker;
pub mod clock;
pub mod retries;
pub mod timeouts;
