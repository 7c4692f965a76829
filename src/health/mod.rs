//! Endpoint health subsystem.
//!
//! # Data Flow
//! ```text
//! RetryingReader
//!     → tracker.is_callable (breaker admission, lazy trial read)
//!     → read primitive
//!     → tracker.record_success / record_failure
//!         → state.rs (streaks, totals, latency window)
//!         → CircuitOpened event on threshold breach
//! ```
//!
//! # Design Decisions
//! - Health state is per-endpoint and per-monitor, never shared between monitors
//! - Single writer (the scheduler task); external readers get snapshots
//! - Breaker state changes are logged and exported as a gauge

pub mod state;
pub mod tracker;

pub use state::{EndpointHealth, HealthSnapshot, LatencyWindow};
pub use tracker::{BreakerSettings, HealthTracker};
