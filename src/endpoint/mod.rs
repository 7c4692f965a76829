//! Endpoint identity.
//!
//! A monitor always talks to exactly two endpoints exposing the same remote
//! resource. Their roles are fixed for the lifetime of a monitor instance.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of an endpoint within a monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointId {
    Primary,
    Secondary,
}

impl EndpointId {
    /// The other endpoint of the pair.
    pub fn other(self) -> Self {
        match self {
            EndpointId::Primary => EndpointId::Secondary,
            EndpointId::Secondary => EndpointId::Primary,
        }
    }

    /// Index into per-endpoint arrays.
    pub(crate) fn index(self) -> usize {
        match self {
            EndpointId::Primary => 0,
            EndpointId::Secondary => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EndpointId::Primary => "primary",
            EndpointId::Secondary => "secondary",
        }
    }
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable network endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub id: EndpointId,
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(id: EndpointId, host: impl Into<String>, port: u16) -> Self {
        Self {
            id,
            host: host.into(),
            port,
        }
    }

    /// `host:port` rendering used in logs and snapshots.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}:{})", self.id, self.host, self.port)
    }
}
