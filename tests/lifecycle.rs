//! Start/stop behaviour of the polling loop.

use std::sync::Arc;
use std::time::{Duration, Instant};

use failover_monitor::reader::MockReader;
use failover_monitor::resilience::circuit_breaker::CircuitPhase;
use failover_monitor::{AccessMode, EndpointId, EventKind, Monitor, ReadError, SchedulerState};

mod common;
use common::{fast_config, EventLog};

#[tokio::test]
async fn test_stop_interrupts_sleep() {
    let mock = Arc::new(MockReader::new());
    let mut config = fast_config(AccessMode::Fallback);
    config.polling.base_interval_secs = 30.0;
    config.polling.min_interval_secs = 25.0;
    config.polling.max_interval_secs = 35.0;
    let mut monitor = Monitor::new(config, mock.clone());

    monitor.start();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(mock.calls(EndpointId::Primary), 1);

    let started = Instant::now();
    monitor.stop().await;
    let elapsed = started.elapsed();

    assert!(elapsed < Duration::from_millis(100), "stop took {:?}", elapsed);
    assert_eq!(monitor.state(), SchedulerState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_start_twice_is_ignored() {
    let mock = Arc::new(MockReader::new());
    let mut monitor = Monitor::new(fast_config(AccessMode::PrimaryOnly), mock.clone());

    monitor.start();
    monitor.start();
    tokio::time::sleep(Duration::from_millis(1_500)).await;
    monitor.stop().await;

    // A second loop would have doubled the reads.
    assert_eq!(mock.calls(EndpointId::Primary), 2);
}

#[tokio::test(start_paused = true)]
async fn test_restart_keeps_counters() {
    let mock = Arc::new(MockReader::new());
    let mut monitor = Monitor::new(fast_config(AccessMode::Both), mock.clone());

    monitor.start();
    tokio::time::sleep(Duration::from_millis(500)).await;
    monitor.stop().await;
    let first_start = monitor.snapshot().started_at_ms;
    assert!(first_start.is_some());

    monitor.start();
    tokio::time::sleep(Duration::from_millis(500)).await;
    monitor.stop().await;

    let stats = monitor.snapshot();
    assert_eq!(stats.total_polls, 2);
    assert_eq!(stats.both_mode_runs, 2);
    assert_eq!(stats.primary.total_successes, 2);
    assert_eq!(stats.started_at_ms, first_start);
}

#[tokio::test(start_paused = true)]
async fn test_stop_waits_for_inflight_read() {
    let mock = Arc::new(MockReader::new());
    mock.latency(EndpointId::Primary, Duration::from_millis(400));
    let mut monitor = Monitor::new(fast_config(AccessMode::PrimaryOnly), mock.clone());

    monitor.start();
    tokio::time::sleep(Duration::from_millis(100)).await;
    monitor.stop().await;

    // The read in progress finished and was recorded.
    let stats = monitor.snapshot();
    assert_eq!(stats.total_polls, 1);
    assert_eq!(stats.successful_polls, 1);
}

#[tokio::test(start_paused = true)]
async fn test_timed_out_stop_keeps_inflight_cycle_and_health() {
    let mock = Arc::new(MockReader::new());
    mock.fail(EndpointId::Primary, ReadError::Connection("refused".into()))
        .succeed(EndpointId::Secondary, 7)
        .latency(EndpointId::Secondary, Duration::from_secs(3));

    let mut config = fast_config(AccessMode::Fallback);
    config.circuit_breaker.failure_threshold = 1;
    config.retries.read_timeout_secs = 30.0;
    config.polling.stop_timeout_secs = 1.0;
    let mut monitor = Monitor::new(config, mock.clone());
    let log = EventLog::attach(&monitor, &[EventKind::Result, EventKind::CircuitOpened]);

    monitor.start();
    tokio::time::sleep(Duration::from_millis(100)).await;
    // The secondary read is still running when the bound elapses.
    monitor.stop().await;
    assert_eq!(monitor.state(), SchedulerState::Stopping);
    assert_eq!(log.count(EventKind::Result), 0);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(monitor.state(), SchedulerState::Idle);
    assert_eq!(log.count(EventKind::Result), 1);
    assert_eq!(log.count(EventKind::CircuitOpened), 1);

    let stats = monitor.snapshot();
    assert_eq!(stats.total_polls, 1);
    assert_eq!(stats.successful_polls, 1);
    assert_eq!(stats.fallback_switches, 1);
    assert_eq!(stats.primary.circuit, CircuitPhase::Open);

    // The breaker opened seconds ago, so the primary is skipped.
    mock.reset_calls();
    let outcome = monitor.poll_once().await.unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.endpoint, EndpointId::Secondary);
    assert_eq!(mock.calls(EndpointId::Primary), 0);
    assert_eq!(mock.calls(EndpointId::Secondary), 1);
}

#[tokio::test(start_paused = true)]
async fn test_start_after_timed_out_stop_waits_for_cycle() {
    let mock = Arc::new(MockReader::new());
    mock.latency(EndpointId::Primary, Duration::from_secs(3));

    let mut config = fast_config(AccessMode::PrimaryOnly);
    config.retries.read_timeout_secs = 30.0;
    config.polling.stop_timeout_secs = 1.0;
    let mut monitor = Monitor::new(config, mock.clone());

    monitor.start();
    tokio::time::sleep(Duration::from_millis(100)).await;
    monitor.stop().await;
    assert_eq!(monitor.state(), SchedulerState::Stopping);

    // The first read ends at t=3, the restarted loop reads again from t=3 to t=6.
    monitor.start();
    assert_eq!(monitor.state(), SchedulerState::Running);
    tokio::time::sleep(Duration::from_millis(2_500)).await;
    assert_eq!(monitor.snapshot().total_polls, 1);
    tokio::time::sleep(Duration::from_secs(3)).await;
    monitor.stop().await;

    assert_eq!(monitor.state(), SchedulerState::Idle);
    assert_eq!(mock.calls(EndpointId::Primary), 2);
    let stats = monitor.snapshot();
    assert_eq!(stats.total_polls, 2);
    assert_eq!(stats.primary.total_successes, 2);
}

#[tokio::test]
async fn test_stop_when_idle_is_noop() {
    let mut monitor = Monitor::new(fast_config(AccessMode::Fallback), Arc::new(MockReader::new()));
    monitor.stop().await;
    assert_eq!(monitor.state(), SchedulerState::Idle);
    assert_eq!(monitor.snapshot().total_polls, 0);
}
