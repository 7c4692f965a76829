//! Read primitive abstraction.
//!
//! # Data Flow
//! ```text
//! RetryingReader
//!     → ValueReader::read_value(endpoint, register)
//!         → blocking.rs (adapter for synchronous client libraries)
//!         → simulated.rs (stand-in endpoints for dry runs)
//!         → mock.rs (scripted responses + call counters for tests)
//! ```
//!
//! # Design Decisions
//! - The wire protocol lives outside this crate; only the contract is defined here
//! - Readers are shared behind `Arc` so a stopped engine can be rebuilt
//! - Timeouts are enforced by the caller, not trusted to the reader

pub mod blocking;
pub mod mock;
pub mod simulated;
pub mod types;

use std::future::Future;

use crate::endpoint::Endpoint;

pub use blocking::BlockingReader;
pub use mock::MockReader;
pub use simulated::SimulatedReader;
pub use types::{ErrorKind, PollOutcome, ReadError};

/// Reads a single value at `register` from `endpoint`.
pub trait ValueReader: Send + Sync + 'static {
    fn read_value(
        &self,
        endpoint: &Endpoint,
        register: u16,
    ) -> impl Future<Output = Result<u16, ReadError>> + Send;
}
