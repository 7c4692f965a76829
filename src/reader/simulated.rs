//! Simulated endpoints for dry runs of the engine.

use rand::Rng;
use std::time::Duration;

use crate::config::schema::{SimulatedEndpointConfig, SimulationConfig};
use crate::endpoint::{Endpoint, EndpointId};
use crate::reader::{ReadError, ValueReader};

/// Reader that fabricates values with configurable latency and failure rate.
#[derive(Debug, Clone)]
pub struct SimulatedReader {
    config: SimulationConfig,
}

impl SimulatedReader {
    pub fn new(config: SimulationConfig) -> Self {
        Self { config }
    }

    fn endpoint_config(&self, id: EndpointId) -> &SimulatedEndpointConfig {
        match id {
            EndpointId::Primary => &self.config.primary,
            EndpointId::Secondary => &self.config.secondary,
        }
    }

    /// Decide the result up front so no RNG is held across an await.
    fn roll(&self, id: EndpointId, register: u16) -> (Duration, Result<u16, ReadError>) {
        let cfg = self.endpoint_config(id);
        let mut rng = rand::thread_rng();

        let latency_ms = if cfg.max_latency_ms > cfg.min_latency_ms {
            rng.gen_range(cfg.min_latency_ms..=cfg.max_latency_ms)
        } else {
            cfg.min_latency_ms
        };

        let result = if rng.gen_bool(cfg.failure_rate.clamp(0.0, 1.0)) {
            match rng.gen_range(0..3) {
                0 => Err(ReadError::Connection(format!("simulated connection reset on {}", id))),
                1 => Err(ReadError::Protocol(format!(
                    "simulated exception response for register {}",
                    register
                ))),
                // Long enough to trip any sane read timeout.
                _ => return (Duration::from_secs(3600), Ok(0)),
            }
        } else {
            Ok(register.wrapping_add(rng.gen_range(0..100)))
        };

        (Duration::from_millis(latency_ms), result)
    }
}

impl ValueReader for SimulatedReader {
    async fn read_value(&self, endpoint: &Endpoint, register: u16) -> Result<u16, ReadError> {
        let (latency, result) = self.roll(endpoint.id, register);
        tokio::time::sleep(latency).await;
        result
    }
}
