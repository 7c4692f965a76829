//! Statistics and event hub.
//!
//! # Data Flow
//! ```text
//! Scheduler task, after each poll:
//!     → stats.rs (fold outcome into RunStatistics, publish snapshot)
//!     → hub.rs (Result / Error events to subscribers)
//!
//! Tracker and dispatcher, during a poll:
//!     → hub.rs (CircuitOpened / Fallback events)
//!
//! External callers:
//!     → StatsHandle::snapshot (lock-free read)
//! ```
//!
//! # Design Decisions
//! - Handlers run inline on the scheduler task and must not block
//! - A panicking handler is logged and skipped
//! - Statistics are single-writer; readers see whole snapshots, never torn counters

pub mod hub;
pub mod stats;

pub use hub::{EventHub, EventKind, MonitorEvent, SubscriptionId};
pub use stats::{RunStatistics, StatsHandle, StatsRecorder};
