//! Access strategy subsystem.
//!
//! # Data Flow
//! ```text
//! Scheduler
//!     → Dispatcher::poll (mode.rs selects the strategy)
//!         → RetryingReader::attempt on one or both endpoints
//!     → authoritative PollOutcome
//! ```
//!
//! # Design Decisions
//! - Mode is fixed per engine; switching modes means building a new engine
//! - On a double failure the first endpoint tried is authoritative
//! - In `both` mode equal latencies resolve to the primary

pub mod dispatcher;
pub mod mode;

pub use dispatcher::{DispatchCounters, Dispatcher};
pub use mode::AccessMode;
