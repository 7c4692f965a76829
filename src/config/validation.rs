//! Configuration validation.
//!
//! Serde handles syntax; this pass checks value ranges and relationships
//! between fields. Every problem is reported, not just the first.

use thiserror::Error;

use crate::config::schema::{EndpointConfig, MonitorConfig, SimulatedEndpointConfig};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{field}: host must not be empty")]
    EmptyHost { field: &'static str },

    #[error("{field}: port must be between 1 and 65535")]
    InvalidPort { field: &'static str },

    #[error("{field} must be greater than zero (got {value})")]
    NotPositive { field: &'static str, value: f64 },

    #[error("{field} must not be negative (got {value})")]
    Negative { field: &'static str, value: f64 },

    #[error("polling.min_interval_secs ({min}) must be less than polling.max_interval_secs ({max})")]
    IntervalBounds { min: f64, max: f64 },

    #[error("retries.base_delay_ms ({base}) must not exceed retries.max_delay_ms ({max})")]
    RetryDelayBounds { base: u64, max: u64 },

    #[error("circuit_breaker.failure_threshold must be at least 1")]
    ZeroFailureThreshold,

    #[error("circuit_breaker.latency_window must be at least 1")]
    ZeroLatencyWindow,

    #[error("{field}.failure_rate must be within [0, 1] (got {value})")]
    FailureRate { field: &'static str, value: f64 },

    #[error("{field}: min_latency_ms ({min}) exceeds max_latency_ms ({max})")]
    LatencyBounds { field: &'static str, min: u64, max: u64 },
}

/// Validate `config`, returning all problems found.
pub fn validate_config(config: &MonitorConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_endpoint(&mut errors, "primary", &config.primary);
    check_endpoint(&mut errors, "secondary", &config.secondary);

    let polling = &config.polling;
    positive(&mut errors, "polling.base_interval_secs", polling.base_interval_secs);
    non_negative(&mut errors, "polling.jitter_range_secs", polling.jitter_range_secs);
    non_negative(&mut errors, "polling.min_interval_secs", polling.min_interval_secs);
    non_negative(&mut errors, "polling.error_pause_secs", polling.error_pause_secs);
    positive(&mut errors, "polling.stop_timeout_secs", polling.stop_timeout_secs);
    if !(polling.min_interval_secs < polling.max_interval_secs) {
        errors.push(ValidationError::IntervalBounds {
            min: polling.min_interval_secs,
            max: polling.max_interval_secs,
        });
    }

    positive(&mut errors, "retries.read_timeout_secs", config.retries.read_timeout_secs);
    if config.retries.base_delay_ms > config.retries.max_delay_ms {
        errors.push(ValidationError::RetryDelayBounds {
            base: config.retries.base_delay_ms,
            max: config.retries.max_delay_ms,
        });
    }

    if config.circuit_breaker.failure_threshold == 0 {
        errors.push(ValidationError::ZeroFailureThreshold);
    }
    if config.circuit_breaker.latency_window == 0 {
        errors.push(ValidationError::ZeroLatencyWindow);
    }

    check_simulation(&mut errors, "simulation.primary", &config.simulation.primary);
    check_simulation(&mut errors, "simulation.secondary", &config.simulation.secondary);

    if config.primary == config.secondary {
        tracing::warn!(
            host = %config.primary.host,
            port = config.primary.port,
            "Primary and secondary point at the same endpoint"
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_endpoint(errors: &mut Vec<ValidationError>, field: &'static str, endpoint: &EndpointConfig) {
    if endpoint.host.trim().is_empty() {
        errors.push(ValidationError::EmptyHost { field });
    }
    if endpoint.port == 0 {
        errors.push(ValidationError::InvalidPort { field });
    }
}

fn check_simulation(errors: &mut Vec<ValidationError>, field: &'static str, sim: &SimulatedEndpointConfig) {
    if !(0.0..=1.0).contains(&sim.failure_rate) {
        errors.push(ValidationError::FailureRate {
            field,
            value: sim.failure_rate,
        });
    }
    if sim.min_latency_ms > sim.max_latency_ms {
        errors.push(ValidationError::LatencyBounds {
            field,
            min: sim.min_latency_ms,
            max: sim.max_latency_ms,
        });
    }
}

fn positive(errors: &mut Vec<ValidationError>, field: &'static str, value: f64) {
    if !(value > 0.0) {
        errors.push(ValidationError::NotPositive { field, value });
    }
}

fn non_negative(errors: &mut Vec<ValidationError>, field: &'static str, value: f64) {
    if !(value >= 0.0) {
        errors.push(ValidationError::Negative { field, value });
    }
}
