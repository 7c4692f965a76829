//! Typed event subscription.

use serde::Serialize;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::endpoint::EndpointId;
use crate::reader::PollOutcome;

/// Events published by the engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MonitorEvent {
    /// Final outcome of one poll cycle.
    Result(PollOutcome),
    /// A poll succeeded only after switching away from the first endpoint tried.
    Fallback {
        from: EndpointId,
        to: EndpointId,
        reason: String,
    },
    /// An endpoint's breaker opened (or re-opened after a failed trial read).
    CircuitOpened {
        endpoint: EndpointId,
        address: String,
        failures: u32,
    },
    /// A failed poll, a failed sink write, or a poll cycle that panicked.
    Error {
        endpoint: Option<EndpointId>,
        detail: String,
    },
}

impl MonitorEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            MonitorEvent::Result(_) => EventKind::Result,
            MonitorEvent::Fallback { .. } => EventKind::Fallback,
            MonitorEvent::CircuitOpened { .. } => EventKind::CircuitOpened,
            MonitorEvent::Error { .. } => EventKind::Error,
        }
    }
}

/// Event classes a handler can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Result,
    Fallback,
    CircuitOpened,
    Error,
}

/// Handle returned by [`EventHub::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler = Arc<dyn Fn(&MonitorEvent) + Send + Sync>;

struct Subscription {
    id: SubscriptionId,
    kind: EventKind,
    handler: Handler,
}

/// Fans events out to registered handlers.
///
/// Handlers run synchronously on the scheduler task. Anything slow delays
/// the next poll, so handlers should hand work off rather than block.
#[derive(Clone, Default)]
pub struct EventHub {
    subscriptions: Arc<RwLock<Vec<Subscription>>>,
    next_id: Arc<AtomicU64>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: Fn(&MonitorEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut subs = self
            .subscriptions
            .write()
            .unwrap_or_else(|p| p.into_inner());
        subs.push(Subscription {
            id,
            kind,
            handler: Arc::new(handler),
        });
        id
    }

    /// Returns false if the subscription was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subs = self
            .subscriptions
            .write()
            .unwrap_or_else(|p| p.into_inner());
        let before = subs.len();
        subs.retain(|s| s.id != id);
        subs.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscriptions
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .len()
    }

    /// Deliver `event` to every handler subscribed to its kind.
    pub fn emit(&self, event: &MonitorEvent) {
        let kind = event.kind();
        // Clone the handler list so a handler may (un)subscribe without deadlocking.
        let handlers: Vec<Handler> = self
            .subscriptions
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .iter()
            .filter(|s| s.kind == kind)
            .map(|s| s.handler.clone())
            .collect();

        for handler in handlers {
            if catch_unwind(AssertUnwindSafe(|| handler(event))).is_err() {
                tracing::error!(event = ?kind, "Event handler panicked");
            }
        }
    }
}

impl std::fmt::Debug for EventHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHub")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn error_event() -> MonitorEvent {
        MonitorEvent::Error {
            endpoint: None,
            detail: "boom".into(),
        }
    }

    #[test]
    fn test_only_matching_kind_is_delivered() {
        let hub = EventHub::new();
        let errors = Arc::new(AtomicUsize::new(0));
        let fallbacks = Arc::new(AtomicUsize::new(0));

        let e = errors.clone();
        hub.subscribe(EventKind::Error, move |_| {
            e.fetch_add(1, Ordering::SeqCst);
        });
        let f = fallbacks.clone();
        hub.subscribe(EventKind::Fallback, move |_| {
            f.fetch_add(1, Ordering::SeqCst);
        });

        hub.emit(&error_event());
        assert_eq!(errors.load(Ordering::SeqCst), 1);
        assert_eq!(fallbacks.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_panicking_handler_does_not_stop_others() {
        let hub = EventHub::new();
        let delivered = Arc::new(AtomicUsize::new(0));

        hub.subscribe(EventKind::Error, |_| panic!("handler bug"));
        let d = delivered.clone();
        hub.subscribe(EventKind::Error, move |_| {
            d.fetch_add(1, Ordering::SeqCst);
        });

        hub.emit(&error_event());
        assert_eq!(delivered.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsubscribe() {
        let hub = EventHub::new();
        let id = hub.subscribe(EventKind::Result, |_| {});
        assert_eq!(hub.subscriber_count(), 1);
        assert!(hub.unsubscribe(id));
        assert!(!hub.unsubscribe(id));
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = MonitorEvent::Fallback {
            from: EndpointId::Primary,
            to: EndpointId::Secondary,
            reason: "connection error: refused".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "fallback");
        assert_eq!(json["from"], "primary");
    }
}
