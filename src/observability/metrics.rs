//! Metrics collection and exposition.
//!
//! # Metrics
//! - `monitor_polls_total` (counter): poll outcomes by endpoint and result
//! - `monitor_read_latency_seconds` (histogram): successful read latency
//! - `monitor_retries_total` (counter): retries scheduled per endpoint
//! - `monitor_circuit_open` (gauge): 1=open, 0=closed
//! - `monitor_fallback_total` (counter): endpoint switches by direction
//!
//! Recording is a no-op until a recorder is installed, so the engine and its
//! tests never depend on the exporter.

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::endpoint::EndpointId;
use crate::reader::PollOutcome;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_poll(outcome: &PollOutcome) {
    let result = match outcome.error_kind {
        None => "success",
        Some(kind) => kind.as_str(),
    };
    metrics::counter!(
        "monitor_polls_total",
        "endpoint" => outcome.endpoint.as_str(),
        "result" => result
    )
    .increment(1);

    if outcome.success {
        if let Some(latency_ms) = outcome.latency_ms {
            metrics::histogram!(
                "monitor_read_latency_seconds",
                "endpoint" => outcome.endpoint.as_str()
            )
            .record(latency_ms / 1000.0);
        }
    }
}

pub fn record_retry(endpoint: EndpointId) {
    metrics::counter!("monitor_retries_total", "endpoint" => endpoint.as_str()).increment(1);
}

pub fn record_circuit_state(endpoint: EndpointId, open: bool) {
    metrics::gauge!("monitor_circuit_open", "endpoint" => endpoint.as_str())
        .set(if open { 1.0 } else { 0.0 });
}

pub fn record_fallback(from: EndpointId, to: EndpointId) {
    metrics::counter!(
        "monitor_fallback_total",
        "from" => from.as_str(),
        "to" => to.as_str()
    )
    .increment(1);
}
