//! Outcome sinks.
//!
//! Durable storage is not the engine's job; a sink is an append-only
//! collaborator the scheduler hands every final outcome to.

pub mod jsonl;

use thiserror::Error;

use crate::reader::PollOutcome;

pub use jsonl::JsonLinesSink;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("sink encoding error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Append-only destination for poll outcomes.
///
/// Called inline on the scheduler task; implementations should be quick.
pub trait OutcomeSink: Send + Sync {
    fn append(&self, outcome: &PollOutcome) -> Result<(), SinkError>;
}
