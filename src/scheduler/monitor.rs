//! The polling engine.
//!
//! A `Monitor` owns one engine core (dispatcher, retrying reader, health
//! tracker, statistics writer). `start()` moves the core into a spawned task;
//! `stop()` signals the task and takes the core back when the loop exits, so
//! health and counters survive a stop/start cycle. A cycle still in flight
//! when the stop timeout elapses is left to finish; the next `start()` or
//! `poll_once()` takes the core back from it.

use futures_util::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::config::schema::secs;
use crate::config::MonitorConfig;
use crate::dispatch::{AccessMode, Dispatcher};
use crate::events::{EventHub, EventKind, MonitorEvent, RunStatistics, StatsHandle, StatsRecorder, SubscriptionId};
use crate::health::{HealthSnapshot, HealthTracker};
use crate::lifecycle::{Shutdown, ShutdownListener};
use crate::observability::metrics;
use crate::reader::{PollOutcome, ValueReader};
use crate::resilience::clock::{Clock, SystemClock};
use crate::resilience::retries::RetryingReader;
use crate::scheduler::interval::IntervalSettings;
use crate::scheduler::state::SchedulerState;
use crate::sink::OutcomeSink;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MonitorError {
    #[error("monitor is running; stop it before polling manually")]
    Running,
}

/// State owned by whoever is currently polling.
struct Core<R> {
    dispatcher: Dispatcher<R>,
    recorder: StatsRecorder,
}

/// Everything the loop needs besides the core. Cheap to clone.
#[derive(Clone)]
struct LoopContext {
    events: EventHub,
    sink: Option<Arc<dyn OutcomeSink>>,
    interval: IntervalSettings,
    error_pause: Duration,
}

struct RunningTask<R> {
    shutdown: Shutdown,
    handle: JoinHandle<Core<R>>,
}

/// Where the next run gets its core from.
enum CoreSource<R> {
    Ready(Core<R>),
    Draining(JoinHandle<Core<R>>),
}

/// Everything needed to build a core from scratch.
struct CoreFactory<R> {
    config: MonitorConfig,
    reader: Arc<R>,
    clock: Arc<dyn Clock>,
    events: EventHub,
    stats: StatsHandle,
}

impl<R: ValueReader> CoreFactory<R> {
    /// Fresh health, counters resumed from the published statistics.
    fn build(&self) -> Core<R> {
        let recorder = StatsRecorder::from_handle(&self.stats);
        let mut dispatcher = build_dispatcher(&self.config, self.reader.clone(), self.clock.clone(), self.events.clone());
        dispatcher.restore_counters(recorder.counters());
        Core { dispatcher, recorder }
    }

    /// Wait for a stopped loop that is still finishing its last cycle.
    async fn reclaim(&self, handle: JoinHandle<Core<R>>) -> Core<R> {
        match handle.await {
            Ok(core) => core,
            Err(e) => {
                tracing::error!(error = %e, "Polling task failed, rebuilding engine state");
                self.build()
            }
        }
    }
}

/// Read-only view of a monitor, shareable with other tasks (admin API).
#[derive(Debug, Clone)]
pub struct MonitorHandle {
    stats: StatsHandle,
    state: Arc<AtomicU8>,
    mode: AccessMode,
}

impl MonitorHandle {
    pub fn snapshot(&self) -> RunStatistics {
        self.stats.snapshot()
    }

    pub fn state(&self) -> SchedulerState {
        SchedulerState::from(self.state.load(Ordering::SeqCst))
    }

    pub fn access_mode(&self) -> AccessMode {
        self.mode
    }

    pub fn endpoints(&self) -> [HealthSnapshot; 2] {
        let stats = self.stats.snapshot();
        [stats.primary, stats.secondary]
    }
}

/// Resilient poller for a primary/secondary endpoint pair.
pub struct Monitor<R> {
    config: MonitorConfig,
    reader: Arc<R>,
    clock: Arc<dyn Clock>,
    events: EventHub,
    sink: Option<Arc<dyn OutcomeSink>>,
    stats: StatsHandle,
    state: Arc<AtomicU8>,
    /// Present while idle.
    core: Option<Core<R>>,
    /// A stopped loop whose last cycle outlived the stop timeout.
    draining: Option<JoinHandle<Core<R>>>,
    /// Present while running.
    running: Option<RunningTask<R>>,
}

impl<R: ValueReader> Monitor<R> {
    pub fn new(config: MonitorConfig, reader: Arc<R>) -> Self {
        Self::with_clock(config, reader, Arc::new(SystemClock))
    }

    /// Build with an explicit clock for breaker timing.
    pub fn with_clock(config: MonitorConfig, reader: Arc<R>, clock: Arc<dyn Clock>) -> Self {
        let events = EventHub::new();
        let (primary, secondary) = config.endpoints();
        let recorder = StatsRecorder::new(RunStatistics::new(config.access_mode, &primary, &secondary));
        let stats = recorder.handle();
        let dispatcher = build_dispatcher(&config, reader.clone(), clock.clone(), events.clone());

        Self {
            config,
            reader,
            clock,
            events,
            sink: None,
            stats,
            state: Arc::new(AtomicU8::new(SchedulerState::Idle as u8)),
            core: Some(Core { dispatcher, recorder }),
            draining: None,
            running: None,
        }
    }

    /// Attach an append-only sink for every final outcome.
    pub fn with_sink(mut self, sink: Arc<dyn OutcomeSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn access_mode(&self) -> AccessMode {
        self.config.access_mode
    }

    pub fn state(&self) -> SchedulerState {
        SchedulerState::from(self.state.load(Ordering::SeqCst))
    }

    pub fn is_running(&self) -> bool {
        self.state() == SchedulerState::Running
    }

    pub fn snapshot(&self) -> RunStatistics {
        self.stats.snapshot()
    }

    pub fn handle(&self) -> MonitorHandle {
        MonitorHandle {
            stats: self.stats.clone(),
            state: self.state.clone(),
            mode: self.config.access_mode,
        }
    }

    /// Register a handler. It runs on the polling task and must not block.
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: Fn(&MonitorEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(kind, handler)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Spawn the polling loop. Calling this while running only logs a warning.
    ///
    /// If the previous run is still finishing a cycle, the new loop waits for
    /// it before its first poll.
    pub fn start(&mut self) {
        if self.running.is_some() {
            tracing::warn!(state = ?self.state(), "Monitor already running, ignoring start");
            return;
        }

        let source = match (self.core.take(), self.draining.take()) {
            (Some(core), _) => CoreSource::Ready(core),
            (None, Some(handle)) => CoreSource::Draining(handle),
            (None, None) => CoreSource::Ready(self.factory().build()),
        };

        let shutdown = Shutdown::new();
        let listener = shutdown.subscribe();
        let ctx = self.loop_context();
        let factory = self.factory();
        let state = self.state.clone();

        let (primary, secondary) = self.config.endpoints();
        tracing::info!(
            mode = %self.config.access_mode,
            strategy = self.config.access_mode.describe(),
            primary = %primary,
            secondary = %secondary,
            base_interval_secs = self.config.polling.base_interval_secs,
            "Monitor starting"
        );

        self.state.store(SchedulerState::Running as u8, Ordering::SeqCst);
        let handle = tokio::spawn(async move {
            let mut core = match source {
                CoreSource::Ready(core) => core,
                CoreSource::Draining(handle) => {
                    tracing::info!("Waiting for the previous run to finish its poll cycle");
                    factory.reclaim(handle).await
                }
            };
            core.recorder.mark_started();
            run_loop(core, ctx, listener, state).await
        });
        self.running = Some(RunningTask { shutdown, handle });
    }

    /// Signal the loop and wait for it, bounded by the stop timeout.
    ///
    /// A sleep in progress is interrupted at once. An in-flight read or
    /// retry is never cancelled: if the loop has not exited when the bound
    /// elapses, `stop()` returns with the state left at `Stopping` and the
    /// cycle finishes in the background, publishing its outcome as usual.
    /// The loop moves the state to `Idle` when it exits.
    pub async fn stop(&mut self) {
        let Some(task) = self.running.take() else {
            tracing::debug!("Monitor not running, nothing to stop");
            return;
        };

        self.state.store(SchedulerState::Stopping as u8, Ordering::SeqCst);
        task.shutdown.trigger();

        let limit = secs(self.config.polling.stop_timeout_secs);
        let mut handle = task.handle;
        let core = match tokio::time::timeout(limit, &mut handle).await {
            Ok(Ok(core)) => core,
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Polling task failed, rebuilding engine state");
                self.factory().build()
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = limit.as_millis() as u64,
                    "Poll cycle still in flight after stop timeout, letting it finish"
                );
                self.draining = Some(handle);
                return;
            }
        };

        self.core = Some(core);
        self.state.store(SchedulerState::Idle as u8, Ordering::SeqCst);
        tracing::info!("Monitor stopped");
    }

    /// Run a single poll cycle on the caller's task. Only valid while idle.
    pub async fn poll_once(&mut self) -> Result<PollOutcome, MonitorError> {
        if self.running.is_some() {
            return Err(MonitorError::Running);
        }
        let ctx = self.loop_context();
        let mut core = match (self.core.take(), self.draining.take()) {
            (Some(core), _) => core,
            (None, Some(handle)) => self.factory().reclaim(handle).await,
            (None, None) => self.factory().build(),
        };
        let outcome = run_cycle(&mut core, &ctx).await;
        self.core = Some(core);
        Ok(outcome)
    }

    fn loop_context(&self) -> LoopContext {
        LoopContext {
            events: self.events.clone(),
            sink: self.sink.clone(),
            interval: self.config.interval_settings(),
            error_pause: secs(self.config.polling.error_pause_secs),
        }
    }

    fn factory(&self) -> CoreFactory<R> {
        CoreFactory {
            config: self.config.clone(),
            reader: self.reader.clone(),
            clock: self.clock.clone(),
            events: self.events.clone(),
            stats: self.stats.clone(),
        }
    }
}

impl<R> Drop for Monitor<R> {
    fn drop(&mut self) {
        if let Some(task) = &self.running {
            task.shutdown.trigger();
        }
    }
}

impl<R> std::fmt::Debug for Monitor<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Monitor")
            .field("mode", &self.config.access_mode)
            .field("state", &SchedulerState::from(self.state.load(Ordering::SeqCst)))
            .field("subscribers", &self.events.subscriber_count())
            .finish()
    }
}

fn build_dispatcher<R: ValueReader>(
    config: &MonitorConfig,
    reader: Arc<R>,
    clock: Arc<dyn Clock>,
    events: EventHub,
) -> Dispatcher<R> {
    let (primary, secondary) = config.endpoints();
    let tracker = HealthTracker::new(primary, secondary, config.breaker_settings(), clock, events.clone());
    let retrying = RetryingReader::new(reader, tracker, config.retry_policy(), config.register);
    Dispatcher::new(config.access_mode, retrying, events)
}

async fn run_loop<R: ValueReader>(
    mut core: Core<R>,
    ctx: LoopContext,
    mut shutdown: ShutdownListener,
    state: Arc<AtomicU8>,
) -> Core<R> {
    loop {
        if shutdown.is_triggered() {
            break;
        }

        let interval = ctx.interval.next_interval();
        let pause = match AssertUnwindSafe(run_cycle(&mut core, &ctx)).catch_unwind().await {
            Ok(_) => interval,
            Err(panic) => {
                let detail = panic_message(panic.as_ref());
                tracing::error!(error = %detail, pause_ms = ctx.error_pause.as_millis() as u64, "Poll cycle panicked");
                ctx.events.emit(&MonitorEvent::Error {
                    endpoint: None,
                    detail: format!("poll cycle panicked: {}", detail),
                });
                ctx.error_pause
            }
        };

        tracing::debug!(next_poll_in_secs = pause.as_secs_f64(), "Waiting for next poll");
        tokio::select! {
            _ = tokio::time::sleep(pause) => {}
            _ = shutdown.recv() => {
                tracing::info!("Monitor received shutdown signal, exiting loop");
                break;
            }
        }
    }

    core.recorder.mark_stopped();
    // Only flips a stop that is already in progress.
    let _ = state.compare_exchange(
        SchedulerState::Stopping as u8,
        SchedulerState::Idle as u8,
        Ordering::SeqCst,
        Ordering::SeqCst,
    );
    core
}

async fn run_cycle<R: ValueReader>(core: &mut Core<R>, ctx: &LoopContext) -> PollOutcome {
    let outcome = core.dispatcher.poll().await;
    core.recorder
        .record(&outcome, core.dispatcher.counters(), core.dispatcher.tracker());
    metrics::record_poll(&outcome);

    if outcome.success {
        tracing::info!(
            endpoint = %outcome.endpoint,
            address = %outcome.address,
            register = outcome.register,
            value = ?outcome.value,
            latency_ms = ?outcome.latency_ms,
            retries = outcome.retries_used,
            "Poll succeeded"
        );
    } else {
        tracing::error!(
            endpoint = %outcome.endpoint,
            address = %outcome.address,
            register = outcome.register,
            error = %outcome.reason(),
            retries = outcome.retries_used,
            "Poll failed"
        );
    }

    if let Some(sink) = &ctx.sink {
        if let Err(e) = sink.append(&outcome) {
            tracing::warn!(error = %e, "Failed to write outcome to sink");
            ctx.events.emit(&MonitorEvent::Error {
                endpoint: None,
                detail: format!("sink write failed: {}", e),
            });
        }
    }

    ctx.events.emit(&MonitorEvent::Result(outcome.clone()));
    if !outcome.success {
        ctx.events.emit(&MonitorEvent::Error {
            endpoint: Some(outcome.endpoint),
            detail: outcome.reason(),
        });
    }
    outcome
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
