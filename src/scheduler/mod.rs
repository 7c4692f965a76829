//! Polling scheduler.
//!
//! # Data Flow
//! ```text
//! Monitor::start
//!     → spawned loop:
//!         → interval.rs (next randomized interval)
//!         → Dispatcher::poll
//!         → statistics, metrics, sink, Result/Error events
//!         → interruptible sleep (woken by Shutdown)
//! Monitor::stop
//!     → trigger Shutdown, join with a bound, take the engine core back
//! ```
//!
//! # Design Decisions
//! - One task owns all mutable engine state; nothing else writes to it
//! - A panicking cycle is reported and followed by a fixed pause, never fatal
//! - An in-flight read is not cancelled by stop; its own timeout bounds it

pub mod interval;
pub mod monitor;
pub mod state;

pub use interval::IntervalSettings;
pub use monitor::{Monitor, MonitorError, MonitorHandle};
pub use state::SchedulerState;
