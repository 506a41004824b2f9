//! Platform-event seam for proctoring signals.
//!
//! The browser-level callbacks (visibility changes, fullscreen transitions)
//! live behind `EventSource` so the monitor and gate depend only on an
//! abstract stream; hosts register the real platform hooks, and tests inject
//! synthetic signals through `SyntheticEventSource`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// The event families a session subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Tab/window visibility and focus.
    Visibility,
    /// Fullscreen element transitions.
    Fullscreen,
}

/// A discrete proctoring-relevant platform event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProctorEvent {
    /// The tab or window lost focus.
    TabHidden,
    /// Focus returned. Informational; never a violation.
    TabVisible,
    /// Fullscreen mode engaged (initial entry or manual re-entry).
    FullscreenEntered,
    /// Fullscreen mode was left.
    FullscreenExited,
}

impl ProctorEvent {
    #[must_use]
    pub fn kind(self) -> EventKind {
        match self {
            ProctorEvent::TabHidden | ProctorEvent::TabVisible => EventKind::Visibility,
            ProctorEvent::FullscreenEntered | ProctorEvent::FullscreenExited => {
                EventKind::Fullscreen
            }
        }
    }
}

/// Where subscribed events are delivered.
pub type EventSink = mpsc::UnboundedSender<ProctorEvent>;

/// Abstract source of platform events.
pub trait EventSource: Send + Sync {
    /// Register a sink for one event family.
    ///
    /// Delivery stops when the returned `Subscription` is dropped; the guard
    /// makes release automatic on every exit path of the run loop.
    fn subscribe(&self, kind: EventKind, sink: EventSink) -> Subscription;
}

/// RAII guard for an event subscription.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    #[must_use]
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

//
// ─── SYNTHETIC SOURCE ──────────────────────────────────────────────────────────
//

#[derive(Default)]
struct Registry {
    next_id: u64,
    sinks: HashMap<u64, (EventKind, EventSink)>,
}

/// In-memory event source for tests and headless hosts.
///
/// `emit` fans an event out to every live subscriber of its kind.
#[derive(Clone, Default)]
pub struct SyntheticEventSource {
    registry: Arc<Mutex<Registry>>,
}

impl SyntheticEventSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver an event to all subscribers of its kind.
    pub fn emit(&self, event: ProctorEvent) {
        let registry = self.lock();
        for (registered_kind, sink) in registry.sinks.values() {
            if *registered_kind == event.kind() {
                // A closed sink just means the subscriber is gone.
                let _ = sink.send(event);
            }
        }
    }

    /// Number of live subscriptions, for leak assertions in tests.
    #[must_use]
    pub fn active_subscriptions(&self) -> usize {
        self.lock().sinks.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Registry> {
        match self.registry.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl EventSource for SyntheticEventSource {
    fn subscribe(&self, kind: EventKind, sink: EventSink) -> Subscription {
        let id = {
            let mut registry = self.lock();
            let id = registry.next_id;
            registry.next_id += 1;
            registry.sinks.insert(id, (kind, sink));
            id
        };

        let registry = Arc::clone(&self.registry);
        Subscription::new(move || {
            let mut registry = match registry.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            registry.sinks.remove(&id);
        })
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_route_by_kind() {
        let source = SyntheticEventSource::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _sub = source.subscribe(EventKind::Visibility, tx);

        source.emit(ProctorEvent::FullscreenExited);
        source.emit(ProctorEvent::TabHidden);

        assert_eq!(rx.try_recv().unwrap(), ProctorEvent::TabHidden);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn dropping_subscription_unsubscribes() {
        let source = SyntheticEventSource::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sub = source.subscribe(EventKind::Fullscreen, tx);
        assert_eq!(source.active_subscriptions(), 1);

        drop(sub);
        assert_eq!(source.active_subscriptions(), 0);

        source.emit(ProctorEvent::FullscreenExited);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn event_kinds_partition_events() {
        assert_eq!(ProctorEvent::TabVisible.kind(), EventKind::Visibility);
        assert_eq!(
            ProctorEvent::FullscreenEntered.kind(),
            EventKind::Fullscreen
        );
    }
}
