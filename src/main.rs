//! Failover monitor
//!
//! Polls one value from a primary/secondary endpoint pair on a randomized
//! interval, with retries, per-endpoint circuit breakers, and a configurable
//! access strategy.
//!
//! # Architecture Overview
//!
//! ```text
//!   ┌──────────────────────────── MONITOR TASK ────────────────────────────┐
//!   │                                                                      │
//!   │  ┌───────────┐   ┌────────────┐   ┌───────────────┐   ┌───────────┐ │
//!   │  │ scheduler │──▶│  dispatch  │──▶│  resilience   │──▶│  reader   │─┼──▶ endpoints
//!   │  │ interval  │   │ (mode)     │   │ retry/timeout │   │ (trait)   │ │
//!   │  └─────┬─────┘   └────────────┘   └───────┬───────┘   └───────────┘ │
//!   │        │                                  ▼                         │
//!   │        │                          ┌───────────────┐                 │
//!   │        │                          │    health     │                 │
//!   │        │                          │ breaker+stats │                 │
//!   │        ▼                          └───────────────┘                 │
//!   │  ┌─────────────────────┐                                            │
//!   │  │ events: stats + hub │──▶ subscribers, sink, metrics              │
//!   │  └──────────┬──────────┘                                            │
//!   └─────────────┼────────────────────────────────────────────────────────┘
//!                 ▼
//!        admin API / monitor-cli (snapshots)
//! ```

use clap::Parser;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use failover_monitor::admin::{setup_admin_router, AdminState};
use failover_monitor::config::watcher::ConfigWatcher;
use failover_monitor::config::{load_config, MonitorConfig};
use failover_monitor::lifecycle::signals::shutdown_signal;
use failover_monitor::observability::{logging, metrics};
use failover_monitor::reader::SimulatedReader;
use failover_monitor::sink::{JsonLinesSink, OutcomeSink};
use failover_monitor::{AccessMode, EventKind, Monitor, Shutdown};

#[derive(Parser)]
#[command(name = "failover-monitor", version)]
#[command(about = "Poll a value from redundant endpoints with failover", long_about = None)]
struct Args {
    /// TOML configuration file; defaults are used when absent.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured access mode.
    #[arg(long, value_parser = AccessMode::from_str)]
    access_mode: Option<AccessMode>,

    /// Stop after this many seconds instead of waiting for a signal.
    #[arg(long)]
    duration_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config_path = args.config.clone().filter(|p| p.exists());
    let mut config = match &config_path {
        Some(path) => load_config(path)?,
        None => MonitorConfig::default(),
    };
    if let Some(mode) = args.access_mode {
        config.access_mode = mode;
    }

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "failover-monitor starting");
    if let (Some(path), None) = (&args.config, &config_path) {
        tracing::warn!(path = ?path, "Config file not found, using defaults");
    }

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let sink = open_sink(&config);
    let mut monitor = build_monitor(&config, sink.clone());
    monitor.start();

    let app_shutdown = Shutdown::new();
    let admin = if config.admin.enabled {
        let state = AdminState::new(monitor.handle(), config.admin.api_key.clone());
        let listener = TcpListener::bind(&config.admin.bind_address).await?;
        tracing::info!(address = %listener.local_addr()?, "Admin API listening");

        let router = setup_admin_router(state.clone());
        let mut stop = app_shutdown.subscribe();
        tokio::spawn(async move {
            let served = axum::serve(listener, router)
                .with_graceful_shutdown(async move { stop.recv().await })
                .await;
            if let Err(e) = served {
                tracing::error!(error = %e, "Admin API failed");
            }
        });
        Some(state)
    } else {
        None
    };

    // Keep the watcher alive for the whole run.
    let (_watcher, mut updates) = match &config_path {
        Some(path) => {
            let (watcher, rx) = ConfigWatcher::new(path);
            match watcher.run() {
                Ok(w) => (Some(w), rx),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to watch config file, hot reload disabled");
                    (None, mpsc::unbounded_channel().1)
                }
            }
        }
        None => (None, mpsc::unbounded_channel().1),
    };

    let deadline = async {
        match args.duration_secs {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);
    let signal = shutdown_signal();
    tokio::pin!(signal);

    loop {
        tokio::select! {
            _ = &mut signal => break,
            _ = &mut deadline => {
                tracing::info!("Run duration elapsed");
                break;
            }
            Some(mut next) = updates.recv() => {
                if let Some(mode) = args.access_mode {
                    next.access_mode = mode;
                }
                tracing::info!(mode = %next.access_mode, "Applying new configuration");
                monitor.stop().await;
                log_summary(&monitor);

                monitor = build_monitor(&next, sink.clone());
                if let Some(state) = &admin {
                    state.replace(monitor.handle());
                }
                monitor.start();
            }
        }
    }

    monitor.stop().await;
    app_shutdown.trigger();

    let stats = monitor.snapshot();
    log_summary(&monitor);
    println!("{}", serde_json::to_string_pretty(&stats)?);

    tracing::info!("Shutdown complete");
    Ok(())
}

fn open_sink(config: &MonitorConfig) -> Option<Arc<dyn OutcomeSink>> {
    let path = config.sink.path.as_ref()?;
    match JsonLinesSink::open(Path::new(path)) {
        Ok(sink) => Some(Arc::new(sink)),
        Err(e) => {
            tracing::error!(path = %path, error = %e, "Failed to open outcome sink, continuing without it");
            None
        }
    }
}

fn build_monitor(config: &MonitorConfig, sink: Option<Arc<dyn OutcomeSink>>) -> Monitor<SimulatedReader> {
    let reader = Arc::new(SimulatedReader::new(config.simulation.clone()));
    let mut monitor = Monitor::new(config.clone(), reader);
    if let Some(sink) = sink {
        monitor = monitor.with_sink(sink);
    }

    for kind in [EventKind::Fallback, EventKind::CircuitOpened] {
        monitor.subscribe(kind, |event| match serde_json::to_string(event) {
            Ok(json) => tracing::debug!(event = %json, "Monitor event"),
            Err(e) => tracing::debug!(error = %e, "Unserializable monitor event"),
        });
    }
    monitor
}

fn log_summary(monitor: &Monitor<SimulatedReader>) {
    let stats = monitor.snapshot();
    tracing::info!(
        mode = %stats.access_mode,
        uptime_secs = stats.uptime_secs,
        total = stats.total_polls,
        ok = stats.successful_polls,
        failed = stats.failed_polls,
        timeouts = stats.timeout_polls,
        success_rate = %format!("{:.1}", stats.success_rate()),
        fallback_switches = stats.fallback_switches,
        alternating_switches = stats.alternating_switches,
        both_mode_runs = stats.both_mode_runs,
        "Run statistics"
    );
    for endpoint in [&stats.primary, &stats.secondary] {
        tracing::info!(
            endpoint = %endpoint.endpoint,
            address = %endpoint.address,
            circuit = ?endpoint.circuit,
            successes = endpoint.total_successes,
            failures = endpoint.total_failures,
            avg_latency_ms = endpoint.average_latency_ms,
            "Endpoint health"
        );
    }
}
