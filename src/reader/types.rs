//! Read results and error definitions.

use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;

use crate::endpoint::EndpointId;

/// Errors the read primitive can report.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReadError {
    /// Transport-level failure to establish or keep a session.
    #[error("connection error: {0}")]
    Connection(String),

    /// The remote answered with an explicit application-level fault.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// No response within the read timeout.
    #[error("read timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
}

impl ReadError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReadError::Connection(_) => ErrorKind::ConnectionError,
            ReadError::Protocol(_) => ErrorKind::ProtocolError,
            ReadError::Timeout(_) => ErrorKind::Timeout,
        }
    }
}

/// Failure classification carried by a [`PollOutcome`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ConnectionError,
    ProtocolError,
    Timeout,
    /// Rejected by the circuit breaker; no I/O was attempted.
    CircuitOpen,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::ConnectionError => "connection_error",
            ErrorKind::ProtocolError => "protocol_error",
            ErrorKind::Timeout => "timeout",
            ErrorKind::CircuitOpen => "circuit_open",
        }
    }
}

/// Result of one logical read against one endpoint. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollOutcome {
    /// Unix time in milliseconds.
    pub timestamp_ms: u64,
    pub endpoint: EndpointId,
    /// `host:port` of the endpoint.
    pub address: String,
    pub register: u16,
    pub success: bool,
    pub value: Option<u16>,
    pub latency_ms: Option<f64>,
    pub error_kind: Option<ErrorKind>,
    pub error_detail: Option<String>,
    pub retries_used: u32,
}

impl PollOutcome {
    pub fn success(
        endpoint: EndpointId,
        address: String,
        register: u16,
        value: u16,
        latency_ms: f64,
        retries_used: u32,
    ) -> Self {
        Self {
            timestamp_ms: unix_millis(),
            endpoint,
            address,
            register,
            success: true,
            value: Some(value),
            latency_ms: Some(latency_ms),
            error_kind: None,
            error_detail: None,
            retries_used,
        }
    }

    pub fn failure(
        endpoint: EndpointId,
        address: String,
        register: u16,
        error: &ReadError,
        latency_ms: f64,
        retries_used: u32,
    ) -> Self {
        Self {
            timestamp_ms: unix_millis(),
            endpoint,
            address,
            register,
            success: false,
            value: None,
            latency_ms: Some(latency_ms),
            error_kind: Some(error.kind()),
            error_detail: Some(error.to_string()),
            retries_used,
        }
    }

    pub fn circuit_open(endpoint: EndpointId, address: String, register: u16) -> Self {
        Self {
            timestamp_ms: unix_millis(),
            endpoint,
            address,
            register,
            success: false,
            value: None,
            latency_ms: None,
            error_kind: Some(ErrorKind::CircuitOpen),
            error_detail: Some("circuit breaker open".to_string()),
            retries_used: 0,
        }
    }

    /// Short human-readable failure reason.
    pub fn reason(&self) -> String {
        self.error_detail
            .clone()
            .unwrap_or_else(|| "unknown".to_string())
    }
}

pub(crate) fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
