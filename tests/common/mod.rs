//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use failover_monitor::{AccessMode, EventKind, Monitor, MonitorConfig, MonitorEvent, ValueReader};

/// A config that polls every second exactly and never retries, so tests
/// under a paused clock can count polls by elapsed seconds.
pub fn fast_config(mode: AccessMode) -> MonitorConfig {
    let mut config = MonitorConfig::default();
    config.access_mode = mode;
    config.polling.base_interval_secs = 1.0;
    config.polling.jitter_range_secs = 0.0;
    config.polling.min_interval_secs = 0.5;
    config.polling.max_interval_secs = 2.0;
    config.polling.error_pause_secs = 1.0;
    config.polling.stop_timeout_secs = 2.0;
    config.retries.max_retries = 0;
    config.retries.read_timeout_secs = 1.0;
    config
}

/// Collects every event of the given kinds, in emission order.
#[derive(Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<MonitorEvent>>>,
}

impl EventLog {
    pub fn attach<R: ValueReader>(monitor: &Monitor<R>, kinds: &[EventKind]) -> Self {
        let log = Self::default();
        for kind in kinds {
            let events = log.events.clone();
            monitor.subscribe(*kind, move |e| events.lock().unwrap().push(e.clone()));
        }
        log
    }

    pub fn all(&self) -> Vec<MonitorEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.events.lock().unwrap().iter().filter(|e| e.kind() == kind).count()
    }
}
