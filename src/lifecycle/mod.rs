//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Monitor::start:
//!     fresh Shutdown → listener moved into the scheduler task
//!
//! Monitor::stop:
//!     Shutdown::trigger → interrupts the inter-poll sleep → task returns its state
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → binary stops the monitor and exits
//! ```
//!
//! # Design Decisions
//! - Cancellation is cooperative; in-flight reads finish within their own timeout
//! - Stop has a deadline; a task that misses it is aborted

pub mod shutdown;
pub mod signals;

pub use shutdown::{Shutdown, ShutdownListener};
