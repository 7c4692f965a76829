//! Resilient polling of a value from a redundant pair of endpoints.

pub mod admin;
pub mod config;
pub mod dispatch;
pub mod endpoint;
pub mod events;
pub mod health;
pub mod lifecycle;
pub mod observability;
pub mod reader;
pub mod resilience;
pub mod scheduler;
pub mod sink;

pub use config::schema::MonitorConfig;
pub use dispatch::AccessMode;
pub use endpoint::{Endpoint, EndpointId};
pub use events::{EventKind, MonitorEvent, RunStatistics};
pub use lifecycle::Shutdown;
pub use reader::{PollOutcome, ReadError, ValueReader};
pub use scheduler::{Monitor, MonitorHandle, SchedulerState};
