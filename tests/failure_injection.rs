//! Failure injection tests for the polling engine.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use failover_monitor::health::HealthSnapshot;
use failover_monitor::reader::{ErrorKind, MockReader};
use failover_monitor::sink::{OutcomeSink, SinkError};
use failover_monitor::resilience::circuit_breaker::CircuitPhase;
use failover_monitor::{
    AccessMode, Endpoint, EndpointId, EventKind, Monitor, MonitorEvent, PollOutcome, ReadError, SchedulerState,
    ValueReader,
};

mod common;
use common::{fast_config, EventLog};

fn refused() -> ReadError {
    ReadError::Connection("connection refused".into())
}

#[tokio::test(start_paused = true)]
async fn test_fallback_to_secondary() {
    let mock = Arc::new(MockReader::new());
    mock.fail(EndpointId::Primary, refused()).succeed(EndpointId::Secondary, 321);

    let mut monitor = Monitor::new(fast_config(AccessMode::Fallback), mock.clone());
    let log = EventLog::attach(&monitor, &[EventKind::Result, EventKind::Fallback, EventKind::Error]);

    monitor.start();
    // Polls at t=0, 1, 2.
    tokio::time::sleep(Duration::from_millis(2_500)).await;
    monitor.stop().await;

    let stats = monitor.snapshot();
    assert_eq!(stats.total_polls, 3);
    assert_eq!(stats.successful_polls, 3);
    assert_eq!(stats.fallback_switches, 3);
    assert_eq!(stats.secondary.total_successes, 3);
    assert_eq!(stats.primary.total_failures, 3);

    assert_eq!(log.count(EventKind::Fallback), 3);
    assert_eq!(log.count(EventKind::Error), 0);
    match &log.all()[0] {
        MonitorEvent::Fallback { from, to, .. } => {
            assert_eq!(*from, EndpointId::Primary);
            assert_eq!(*to, EndpointId::Secondary);
        }
        other => panic!("expected a fallback event first, got {:?}", other),
    }
    match log.all().last() {
        Some(MonitorEvent::Result(outcome)) => {
            assert_eq!(outcome.endpoint, EndpointId::Secondary);
            assert_eq!(outcome.value, Some(321));
        }
        other => panic!("expected a result event last, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_open_circuit_skips_reads() {
    let mock = Arc::new(MockReader::new());
    mock.fail(EndpointId::Primary, refused());

    let mut config = fast_config(AccessMode::PrimaryOnly);
    config.circuit_breaker.failure_threshold = 3;
    let mut monitor = Monitor::new(config, mock.clone());
    let log = EventLog::attach(&monitor, &[EventKind::CircuitOpened, EventKind::Error]);

    monitor.start();
    // Failures at t=0, 1, 2 open the breaker; t=3 and t=4 are rejected.
    tokio::time::sleep(Duration::from_millis(4_500)).await;
    monitor.stop().await;

    assert_eq!(mock.calls(EndpointId::Primary), 3);
    assert_eq!(mock.calls(EndpointId::Secondary), 0);

    let stats = monitor.snapshot();
    assert_eq!(stats.total_polls, 5);
    assert_eq!(stats.failed_polls, 5);
    assert_eq!(stats.primary.circuit, CircuitPhase::Open);
    assert!(!stats.primary.available);

    assert_eq!(log.count(EventKind::CircuitOpened), 1);
    // One error event per failed poll, rejected ones included.
    assert_eq!(log.count(EventKind::Error), 5);
}

#[tokio::test(start_paused = true)]
async fn test_trial_read_after_recovery_closes_circuit() {
    let mock = Arc::new(MockReader::new());
    mock.script(EndpointId::Primary, [Err(refused()), Err(refused()), Err(refused())])
        .succeed(EndpointId::Primary, 5);

    let mut config = fast_config(AccessMode::PrimaryOnly);
    config.circuit_breaker.failure_threshold = 3;
    config.circuit_breaker.recovery_timeout_secs = 5;
    let mut monitor = Monitor::new(config, mock.clone());

    monitor.start();
    // Opens at t=2, rejects t=3..6, tries again at t=7, closed again at t=8.
    tokio::time::sleep(Duration::from_millis(8_500)).await;
    monitor.stop().await;

    assert_eq!(mock.calls(EndpointId::Primary), 5);
    let primary: HealthSnapshot = monitor.snapshot().primary;
    assert_eq!(primary.circuit, CircuitPhase::Closed);
    assert_eq!(primary.consecutive_failures, 0);
    assert_eq!(primary.total_successes, 2);
}

#[tokio::test(start_paused = true)]
async fn test_alternating_spreads_load() {
    let mock = Arc::new(MockReader::new());
    mock.succeed(EndpointId::Primary, 1).succeed(EndpointId::Secondary, 2);

    let mut monitor = Monitor::new(fast_config(AccessMode::Alternating), mock.clone());
    monitor.start();
    // Polls at t=0..3.
    tokio::time::sleep(Duration::from_millis(3_500)).await;
    monitor.stop().await;

    assert_eq!(mock.calls(EndpointId::Primary), 2);
    assert_eq!(mock.calls(EndpointId::Secondary), 2);
    assert_eq!(monitor.snapshot().alternating_switches, 0);
}

#[tokio::test(start_paused = true)]
async fn test_hung_read_times_out() {
    let mock = Arc::new(MockReader::new());
    mock.latency(EndpointId::Primary, Duration::from_secs(3_600));

    let mut monitor = Monitor::new(fast_config(AccessMode::PrimaryOnly), mock.clone());
    let outcome = monitor.poll_once().await.unwrap();

    assert!(!outcome.success);
    assert_eq!(outcome.error_kind, Some(ErrorKind::Timeout));
    assert_eq!(monitor.snapshot().timeout_polls, 1);
}

/// Panics on its first read, then succeeds.
#[derive(Default)]
struct FlakyPanicReader {
    calls: AtomicUsize,
}

impl ValueReader for FlakyPanicReader {
    async fn read_value(&self, _endpoint: &Endpoint, _register: u16) -> Result<u16, ReadError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            panic!("driver bug");
        }
        Ok(9)
    }
}

#[tokio::test(start_paused = true)]
async fn test_panicking_cycle_does_not_kill_loop() {
    let reader = Arc::new(FlakyPanicReader::default());
    let mut monitor = Monitor::new(fast_config(AccessMode::PrimaryOnly), reader.clone());
    let log = EventLog::attach(&monitor, &[EventKind::Error, EventKind::Result]);

    monitor.start();
    // Panic at t=0, error pause of 1s, then polls at t=1 and t=2.
    tokio::time::sleep(Duration::from_millis(2_500)).await;
    assert_eq!(monitor.state(), SchedulerState::Running);
    monitor.stop().await;

    assert_eq!(reader.calls.load(Ordering::SeqCst), 3);
    let events = log.all();
    match &events[0] {
        MonitorEvent::Error { endpoint, detail } => {
            assert_eq!(*endpoint, None);
            assert!(detail.contains("driver bug"), "unexpected detail: {}", detail);
        }
        other => panic!("expected an error event first, got {:?}", other),
    }
    assert_eq!(log.count(EventKind::Result), 2);
    assert_eq!(monitor.snapshot().successful_polls, 2);
}

#[tokio::test(start_paused = true)]
async fn test_panicking_handler_is_isolated() {
    let mock = Arc::new(MockReader::new());
    let mut monitor = Monitor::new(fast_config(AccessMode::Fallback), mock);
    monitor.subscribe(EventKind::Result, |_| panic!("bad subscriber"));
    let log = EventLog::attach(&monitor, &[EventKind::Result]);

    monitor.start();
    tokio::time::sleep(Duration::from_millis(1_500)).await;
    monitor.stop().await;

    assert_eq!(log.count(EventKind::Result), 2);
    assert_eq!(monitor.snapshot().total_polls, 2);
}

/// Every write fails, as on a full disk.
#[derive(Default)]
struct BrokenSink {
    attempts: AtomicUsize,
}

impl OutcomeSink for BrokenSink {
    fn append(&self, _outcome: &PollOutcome) -> Result<(), SinkError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(SinkError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            "no space left on device",
        )))
    }
}

#[tokio::test(start_paused = true)]
async fn test_sink_failure_reported_and_loop_continues() {
    let mock = Arc::new(MockReader::new());
    let sink = Arc::new(BrokenSink::default());
    let mut monitor = Monitor::new(fast_config(AccessMode::Fallback), mock).with_sink(sink.clone());
    let log = EventLog::attach(&monitor, &[EventKind::Error, EventKind::Result]);

    monitor.start();
    // Polls at t=0, 1, 2.
    tokio::time::sleep(Duration::from_millis(2_500)).await;
    assert_eq!(monitor.state(), SchedulerState::Running);
    monitor.stop().await;

    assert_eq!(sink.attempts.load(Ordering::SeqCst), 3);
    assert_eq!(log.count(EventKind::Result), 3);
    let sink_errors: Vec<String> = log
        .all()
        .into_iter()
        .filter_map(|e| match e {
            MonitorEvent::Error { endpoint: None, detail } => Some(detail),
            _ => None,
        })
        .collect();
    assert_eq!(sink_errors.len(), 3);
    assert!(sink_errors[0].contains("no space left on device"), "{}", sink_errors[0]);
    assert_eq!(log.count(EventKind::Error), 3);
    assert_eq!(monitor.snapshot().successful_polls, 3);
}
