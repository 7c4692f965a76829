//! Scriptable reader for tests and examples.
//!
//! Each endpoint has a queue of scripted results consumed in order, a
//! default result used once the queue is empty, and a fixed latency applied
//! with `tokio::time::sleep` (exact under a paused test clock).

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::endpoint::{Endpoint, EndpointId};
use crate::reader::{ReadError, ValueReader};

#[derive(Debug)]
struct Behavior {
    script: VecDeque<Result<u16, ReadError>>,
    default: Result<u16, ReadError>,
    latency: Duration,
}

impl Default for Behavior {
    fn default() -> Self {
        Self {
            script: VecDeque::new(),
            default: Ok(0),
            latency: Duration::ZERO,
        }
    }
}

/// A mock read primitive with per-endpoint call counters.
#[derive(Debug, Default)]
pub struct MockReader {
    behaviors: [Mutex<Behavior>; 2],
    calls: [AtomicUsize; 2],
}

impl MockReader {
    /// Both endpoints succeed immediately with value 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every unscripted read on `id` returns `value`.
    pub fn succeed(&self, id: EndpointId, value: u16) -> &Self {
        self.with_behavior(id, |b| b.default = Ok(value));
        self
    }

    /// Every unscripted read on `id` fails with `error`.
    pub fn fail(&self, id: EndpointId, error: ReadError) -> &Self {
        self.with_behavior(id, |b| b.default = Err(error));
        self
    }

    /// Queue results returned, in order, before falling back to the default.
    pub fn script<I>(&self, id: EndpointId, results: I) -> &Self
    where
        I: IntoIterator<Item = Result<u16, ReadError>>,
    {
        self.with_behavior(id, |b| b.script.extend(results));
        self
    }

    /// Simulated round-trip time for every read on `id`.
    pub fn latency(&self, id: EndpointId, latency: Duration) -> &Self {
        self.with_behavior(id, |b| b.latency = latency);
        self
    }

    /// Number of reads performed against `id`.
    pub fn calls(&self, id: EndpointId) -> usize {
        self.calls[id.index()].load(Ordering::SeqCst)
    }

    pub fn reset_calls(&self) {
        for counter in &self.calls {
            counter.store(0, Ordering::SeqCst);
        }
    }

    fn with_behavior(&self, id: EndpointId, f: impl FnOnce(&mut Behavior)) {
        let mut behavior = self.behaviors[id.index()]
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut behavior);
    }

    fn next_result(&self, id: EndpointId) -> (Result<u16, ReadError>, Duration) {
        let mut behavior = self.behaviors[id.index()]
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let result = behavior
            .script
            .pop_front()
            .unwrap_or_else(|| behavior.default.clone());
        (result, behavior.latency)
    }
}

impl ValueReader for MockReader {
    async fn read_value(&self, endpoint: &Endpoint, _register: u16) -> Result<u16, ReadError> {
        self.calls[endpoint.id.index()].fetch_add(1, Ordering::SeqCst);
        let (result, latency) = self.next_result(endpoint.id);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        result
    }
}
