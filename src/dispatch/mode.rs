//! Endpoint access modes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the dispatcher picks endpoints for each poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum AccessMode {
    /// Primary first, secondary only when the primary fails.
    #[default]
    Fallback,
    /// Start endpoint alternates every poll; the other one is the fallback.
    Alternating,
    /// Read both every poll and keep the better result.
    Both,
    PrimaryOnly,
    SecondaryOnly,
}

impl AccessMode {
    pub const ALL: [AccessMode; 5] = [
        AccessMode::Fallback,
        AccessMode::Alternating,
        AccessMode::Both,
        AccessMode::PrimaryOnly,
        AccessMode::SecondaryOnly,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AccessMode::Fallback => "fallback",
            AccessMode::Alternating => "alternating",
            AccessMode::Both => "both",
            AccessMode::PrimaryOnly => "primary_only",
            AccessMode::SecondaryOnly => "secondary_only",
        }
    }

    /// One-line description for logs and the admin API.
    pub fn describe(self) -> &'static str {
        match self {
            AccessMode::Fallback => "primary first, secondary only on failure",
            AccessMode::Alternating => "alternates the starting endpoint every poll",
            AccessMode::Both => "reads both endpoints every poll, keeps the faster success",
            AccessMode::PrimaryOnly => "only the primary endpoint is used",
            AccessMode::SecondaryOnly => "only the secondary endpoint is used",
        }
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for strict parsing (CLI flags).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown access mode '{0}' (expected one of: fallback, alternating, both, primary_only, secondary_only)")]
pub struct UnknownAccessMode(pub String);

impl FromStr for AccessMode {
    type Err = UnknownAccessMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        AccessMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == normalized)
            .ok_or_else(|| UnknownAccessMode(s.to_string()))
    }
}

/// Lenient conversion used for config files: unknown modes degrade to
/// `Fallback` with a warning instead of rejecting the whole file.
impl From<String> for AccessMode {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|e: UnknownAccessMode| {
            tracing::warn!(error = %e, "Unknown access mode, using fallback");
            AccessMode::Fallback
        })
    }
}
