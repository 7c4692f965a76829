//! Run statistics.
//!
//! The scheduler task is the only writer. After every poll it publishes a
//! fresh immutable snapshot through an `ArcSwap`, so external readers never
//! contend with the polling loop.

use arc_swap::ArcSwap;
use serde::Serialize;
use std::sync::Arc;

use crate::dispatch::{AccessMode, DispatchCounters};
use crate::endpoint::{Endpoint, EndpointId};
use crate::health::{HealthSnapshot, HealthTracker};
use crate::reader::types::unix_millis;
use crate::reader::{ErrorKind, PollOutcome};

/// Aggregated counters across polls plus both endpoint health records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunStatistics {
    pub access_mode: AccessMode,
    /// Unix milliseconds of the first `start()`, if any.
    pub started_at_ms: Option<u64>,
    /// Unix milliseconds of the current run's start; `None` while idle.
    pub running_since_ms: Option<u64>,
    /// Time spent running, summed over every start/stop cycle.
    pub uptime_secs: f64,
    pub total_polls: u64,
    pub successful_polls: u64,
    pub failed_polls: u64,
    pub timeout_polls: u64,
    pub fallback_switches: u64,
    pub alternating_switches: u64,
    pub both_mode_runs: u64,
    pub primary: HealthSnapshot,
    pub secondary: HealthSnapshot,
}

impl RunStatistics {
    pub fn new(access_mode: AccessMode, primary: &Endpoint, secondary: &Endpoint) -> Self {
        Self {
            access_mode,
            started_at_ms: None,
            running_since_ms: None,
            uptime_secs: 0.0,
            total_polls: 0,
            successful_polls: 0,
            failed_polls: 0,
            timeout_polls: 0,
            fallback_switches: 0,
            alternating_switches: 0,
            both_mode_runs: 0,
            primary: HealthSnapshot::fresh(primary),
            secondary: HealthSnapshot::fresh(secondary),
        }
    }

    /// Percentage of successful polls, 0 before the first poll.
    pub fn success_rate(&self) -> f64 {
        if self.total_polls == 0 {
            return 0.0;
        }
        self.successful_polls as f64 / self.total_polls as f64 * 100.0
    }

    pub fn endpoint(&self, id: EndpointId) -> &HealthSnapshot {
        match id {
            EndpointId::Primary => &self.primary,
            EndpointId::Secondary => &self.secondary,
        }
    }
}

/// Cloneable read handle onto the published statistics.
#[derive(Debug, Clone)]
pub struct StatsHandle {
    published: Arc<ArcSwap<RunStatistics>>,
}

impl StatsHandle {
    pub fn snapshot(&self) -> RunStatistics {
        let current = self.published.load_full();
        let mut stats = RunStatistics::clone(&current);
        if let Some(since) = stats.running_since_ms {
            stats.uptime_secs += elapsed_secs(since);
        }
        stats
    }
}

/// Writer side, owned by the scheduler task.
#[derive(Debug)]
pub struct StatsRecorder {
    current: RunStatistics,
    published: Arc<ArcSwap<RunStatistics>>,
}

impl StatsRecorder {
    pub fn new(initial: RunStatistics) -> Self {
        let published = Arc::new(ArcSwap::from_pointee(initial.clone()));
        Self {
            current: initial,
            published,
        }
    }

    /// Resume writing into an existing publication, keeping its counters.
    pub fn from_handle(handle: &StatsHandle) -> Self {
        Self {
            current: RunStatistics::clone(&handle.published.load_full()),
            published: handle.published.clone(),
        }
    }

    pub fn handle(&self) -> StatsHandle {
        StatsHandle {
            published: self.published.clone(),
        }
    }

    /// Begin a run. `started_at_ms` keeps the first start across restarts.
    pub fn mark_started(&mut self) {
        let now = unix_millis();
        self.current.started_at_ms.get_or_insert(now);
        self.current.running_since_ms = Some(now);
        self.publish();
    }

    /// End a run, folding its duration into `uptime_secs`.
    pub fn mark_stopped(&mut self) {
        if let Some(since) = self.current.running_since_ms.take() {
            self.current.uptime_secs += elapsed_secs(since);
            self.publish();
        }
    }

    /// Fold one poll outcome plus the dispatcher's current state into the
    /// statistics and publish.
    pub fn record(&mut self, outcome: &PollOutcome, counters: DispatchCounters, tracker: &HealthTracker) {
        let stats = &mut self.current;
        stats.total_polls += 1;
        if outcome.success {
            stats.successful_polls += 1;
        } else {
            stats.failed_polls += 1;
            if outcome.error_kind == Some(ErrorKind::Timeout) {
                stats.timeout_polls += 1;
            }
        }
        stats.fallback_switches = counters.fallback_switches;
        stats.alternating_switches = counters.alternating_switches;
        stats.both_mode_runs = counters.both_mode_runs;
        self.sync_health(tracker);
    }

    /// Switch counters as last published.
    pub fn counters(&self) -> DispatchCounters {
        DispatchCounters {
            fallback_switches: self.current.fallback_switches,
            alternating_switches: self.current.alternating_switches,
            both_mode_runs: self.current.both_mode_runs,
        }
    }

    /// Refresh the health records without counting a poll.
    pub fn sync_health(&mut self, tracker: &HealthTracker) {
        self.current.primary = tracker.snapshot(EndpointId::Primary);
        self.current.secondary = tracker.snapshot(EndpointId::Secondary);
        self.publish();
    }

    fn publish(&self) {
        self.published.store(Arc::new(self.current.clone()));
    }
}

fn elapsed_secs(since_ms: u64) -> f64 {
    unix_millis().saturating_sub(since_ms) as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventHub;
    use crate::health::BreakerSettings;
    use crate::reader::ReadError;
    use crate::resilience::clock::SystemClock;
    use std::time::Duration;

    fn endpoints() -> (Endpoint, Endpoint) {
        (
            Endpoint::new(EndpointId::Primary, "10.0.0.1", 502),
            Endpoint::new(EndpointId::Secondary, "10.0.0.2", 5020),
        )
    }

    fn tracker() -> HealthTracker {
        let (p, s) = endpoints();
        HealthTracker::new(
            p,
            s,
            BreakerSettings {
                failure_threshold: 5,
                recovery_timeout: Duration::from_secs(60),
                latency_window: 10,
            },
            Arc::new(SystemClock),
            EventHub::new(),
        )
    }

    #[tokio::test]
    async fn test_counters_and_publication() {
        let (p, s) = endpoints();
        let mut recorder = StatsRecorder::new(RunStatistics::new(AccessMode::Fallback, &p, &s));
        let handle = recorder.handle();
        let tracker = tracker();

        let ok = PollOutcome::success(EndpointId::Primary, p.address(), 1000, 1, 5.0, 0);
        let timeout = PollOutcome::failure(
            EndpointId::Primary,
            p.address(),
            1000,
            &ReadError::Timeout(Duration::from_secs(5)),
            5000.0,
            3,
        );
        let refused = PollOutcome::failure(
            EndpointId::Secondary,
            s.address(),
            1000,
            &ReadError::Connection("refused".into()),
            1.0,
            3,
        );

        let counters = DispatchCounters {
            fallback_switches: 2,
            ..Default::default()
        };
        recorder.record(&ok, counters, &tracker);
        recorder.record(&timeout, counters, &tracker);
        recorder.record(&refused, counters, &tracker);

        let snap = handle.snapshot();
        assert_eq!(snap.total_polls, 3);
        assert_eq!(snap.successful_polls, 1);
        assert_eq!(snap.failed_polls, 2);
        assert_eq!(snap.timeout_polls, 1);
        assert_eq!(snap.fallback_switches, 2);
        assert!((snap.success_rate() - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_from_handle_shares_publication() {
        let (p, s) = endpoints();
        let tracker = tracker();
        let mut first = StatsRecorder::new(RunStatistics::new(AccessMode::Alternating, &p, &s));
        let handle = first.handle();
        let ok = PollOutcome::success(EndpointId::Secondary, s.address(), 1000, 9, 2.0, 0);
        let counters = DispatchCounters {
            alternating_switches: 4,
            ..Default::default()
        };
        first.record(&ok, counters, &tracker);

        let mut resumed = StatsRecorder::from_handle(&handle);
        assert_eq!(resumed.counters(), counters);
        resumed.record(&ok, resumed.counters(), &tracker);
        assert_eq!(handle.snapshot().total_polls, 2);
        assert_eq!(handle.snapshot().alternating_switches, 4);
    }

    #[test]
    fn test_uptime_frozen_while_idle() {
        let (p, s) = endpoints();
        let mut recorder = StatsRecorder::new(RunStatistics::new(AccessMode::Fallback, &p, &s));
        let handle = recorder.handle();

        recorder.mark_started();
        std::thread::sleep(Duration::from_millis(30));
        assert!(handle.snapshot().uptime_secs >= 0.03);
        recorder.mark_stopped();

        let stopped = handle.snapshot();
        assert_eq!(stopped.running_since_ms, None);
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(handle.snapshot().uptime_secs, stopped.uptime_secs);

        // A second run adds to the total instead of restarting it.
        let first_start = stopped.started_at_ms;
        recorder.mark_started();
        recorder.mark_stopped();
        let again = handle.snapshot();
        assert_eq!(again.started_at_ms, first_start);
        assert!(again.uptime_secs >= stopped.uptime_secs);
    }

    #[test]
    fn test_empty_success_rate() {
        let (p, s) = endpoints();
        let stats = RunStatistics::new(AccessMode::Both, &p, &s);
        assert_eq!(stats.success_rate(), 0.0);
        assert_eq!(stats.endpoint(EndpointId::Secondary).address, "10.0.0.2:5020");
    }
}
