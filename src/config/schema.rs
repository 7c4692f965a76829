//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the monitor.
//! All types derive Serde traits for deserialization from config files, and
//! every field has a default so a minimal file only names what differs.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::dispatch::AccessMode;
use crate::endpoint::{Endpoint, EndpointId};
use crate::health::BreakerSettings;
use crate::resilience::backoff::BackoffPolicy;
use crate::resilience::retries::RetryPolicy;
use crate::scheduler::interval::IntervalSettings;

/// Root configuration for a monitor.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct MonitorConfig {
    /// Primary endpoint.
    pub primary: EndpointConfig,

    /// Secondary endpoint.
    pub secondary: EndpointConfig,

    /// Exchange the roles of the two configured hosts.
    pub swap_endpoints: bool,

    /// Endpoint access strategy.
    pub access_mode: AccessMode,

    /// Address of the value read on every poll.
    pub register: u16,

    /// Poll scheduling.
    pub polling: PollingConfig,

    /// Per-endpoint retry behaviour.
    pub retries: RetryConfig,

    /// Circuit breaker settings.
    pub circuit_breaker: CircuitBreakerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin API settings.
    pub admin: AdminConfig,

    /// Outcome sink settings.
    pub sink: SinkConfig,

    /// Behaviour of the bundled simulated reader.
    pub simulation: SimulationConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            primary: EndpointConfig {
                host: "192.168.178.125".to_string(),
                port: 502,
            },
            secondary: EndpointConfig {
                host: "192.168.178.57".to_string(),
                port: 5020,
            },
            swap_endpoints: false,
            access_mode: AccessMode::Fallback,
            register: 1000,
            polling: PollingConfig::default(),
            retries: RetryConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            observability: ObservabilityConfig::default(),
            admin: AdminConfig::default(),
            sink: SinkConfig::default(),
            simulation: SimulationConfig::default(),
        }
    }
}

impl MonitorConfig {
    /// The (primary, secondary) pair after applying `swap_endpoints`.
    pub fn endpoints(&self) -> (Endpoint, Endpoint) {
        let (first, second) = if self.swap_endpoints {
            (&self.secondary, &self.primary)
        } else {
            (&self.primary, &self.secondary)
        };
        (
            Endpoint::new(EndpointId::Primary, first.host.clone(), first.port),
            Endpoint::new(EndpointId::Secondary, second.host.clone(), second.port),
        )
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.retries.max_retries,
            read_timeout: secs(self.retries.read_timeout_secs),
            backoff: BackoffPolicy {
                base_delay: Duration::from_millis(self.retries.base_delay_ms),
                max_delay: Duration::from_millis(self.retries.max_delay_ms),
                exponential: self.retries.exponential_backoff,
            },
        }
    }

    pub fn breaker_settings(&self) -> BreakerSettings {
        BreakerSettings {
            failure_threshold: self.circuit_breaker.failure_threshold,
            recovery_timeout: Duration::from_secs(self.circuit_breaker.recovery_timeout_secs),
            latency_window: self.circuit_breaker.latency_window,
        }
    }

    pub fn interval_settings(&self) -> IntervalSettings {
        IntervalSettings {
            base_secs: self.polling.base_interval_secs,
            jitter_range_secs: self.polling.jitter_range_secs,
            min_secs: self.polling.min_interval_secs,
            max_secs: self.polling.max_interval_secs,
        }
    }
}

/// Clamp-to-zero conversion for user-supplied fractional seconds.
pub(crate) fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value.max(0.0)).unwrap_or(Duration::MAX)
}

/// Network endpoint.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct EndpointConfig {
    /// Hostname or IP address.
    pub host: String,

    /// TCP port.
    pub port: u16,
}

/// Poll scheduling.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct PollingConfig {
    /// Nominal seconds between polls.
    pub base_interval_secs: f64,

    /// Uniform random offset (±) applied to every interval.
    pub jitter_range_secs: f64,

    /// Lower clamp for the randomized interval.
    pub min_interval_secs: f64,

    /// Upper clamp for the randomized interval.
    pub max_interval_secs: f64,

    /// Pause after a poll cycle that panicked.
    pub error_pause_secs: f64,

    /// How long `stop()` waits for the loop to exit.
    pub stop_timeout_secs: f64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            base_interval_secs: 30.0,
            jitter_range_secs: 5.0,
            min_interval_secs: 25.0,
            max_interval_secs: 35.0,
            error_pause_secs: 5.0,
            stop_timeout_secs: 5.0,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    /// Deadline for a single read.
    pub read_timeout_secs: f64,

    /// Retries after the first attempt of a logical read.
    pub max_retries: u32,

    /// Base delay between retries in milliseconds.
    pub base_delay_ms: u64,

    /// Double the delay on every retry.
    pub exponential_backoff: bool,

    /// Cap on the retry delay in milliseconds (before jitter).
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            read_timeout_secs: 5.0,
            max_retries: 3,
            base_delay_ms: 2000,
            exponential_backoff: true,
            max_delay_ms: 30_000,
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Consecutive failed reads before the circuit opens.
    pub failure_threshold: u32,

    /// Seconds an open circuit rejects reads before admitting a trial read.
    pub recovery_timeout_secs: u64,

    /// Number of recent latencies kept per endpoint.
    pub latency_window: usize,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout_secs: 60,
            latency_window: 100,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log line format.
    pub log_format: LogFormat,

    /// Enable the Prometheus exporter.
    pub metrics_enabled: bool,

    /// Exporter bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AdminConfig {
    /// Serve the admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: placeholder, replace before exposing the API.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

/// Outcome sink configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct SinkConfig {
    /// JSON-lines file receiving every poll outcome.
    pub path: Option<String>,
}

/// Simulated endpoint behaviour.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SimulatedEndpointConfig {
    /// Probability in [0, 1] that a read fails.
    pub failure_rate: f64,

    /// Lower bound of the simulated round trip.
    pub min_latency_ms: u64,

    /// Upper bound of the simulated round trip.
    pub max_latency_ms: u64,
}

impl Default for SimulatedEndpointConfig {
    fn default() -> Self {
        Self {
            failure_rate: 0.05,
            min_latency_ms: 5,
            max_latency_ms: 50,
        }
    }
}

/// Simulated reader configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Default)]
#[serde(default)]
pub struct SimulationConfig {
    pub primary: SimulatedEndpointConfig,
    pub secondary: SimulatedEndpointConfig,
}
