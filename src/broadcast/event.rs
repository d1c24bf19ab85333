//! Broadcaster lifecycle events
//!
//! Events are delivered synchronously to at most one registered listener.
//! They are not queued: with no listener registered an event is dropped.

use std::sync::{Arc, PoisonError, RwLock};

/// Kind of broadcaster event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcastEventKind {
    /// Recording queue size changed
    QueueChanged,
    /// Connection state changed
    StateChanged,
    /// A recording finished streaming
    StreamedCountChanged,
    /// A recording aged off the queue
    AgedOffCountChanged,
}

/// A lifecycle event raised by a broadcaster
#[derive(Debug, Clone)]
pub struct BroadcastEvent {
    /// Name of the stream that raised the event
    pub source: Arc<str>,
    /// What changed
    pub kind: BroadcastEventKind,
}

impl BroadcastEvent {
    pub fn new(source: Arc<str>, kind: BroadcastEventKind) -> Self {
        Self { source, kind }
    }
}

/// Observer of broadcaster events
pub trait BroadcastListener: Send + Sync {
    fn on_event(&self, event: &BroadcastEvent);
}

impl<F> BroadcastListener for F
where
    F: Fn(&BroadcastEvent) + Send + Sync,
{
    fn on_event(&self, event: &BroadcastEvent) {
        self(event)
    }
}

/// Single-slot event fan-out
///
/// Registering a listener replaces the previous one.
pub(crate) struct EventNotifier {
    source: Arc<str>,
    listener: RwLock<Option<Arc<dyn BroadcastListener>>>,
}

impl EventNotifier {
    pub(crate) fn new(source: Arc<str>) -> Self {
        Self {
            source,
            listener: RwLock::new(None),
        }
    }

    pub(crate) fn set_listener(&self, listener: Arc<dyn BroadcastListener>) {
        *self.listener.write().unwrap_or_else(PoisonError::into_inner) = Some(listener);
    }

    pub(crate) fn remove_listener(&self) {
        *self.listener.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Deliver an event to the registered listener, if any
    pub(crate) fn notify(&self, kind: BroadcastEventKind) {
        // Clone out of the lock so a listener may re-register itself
        let listener = self
            .listener
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        if let Some(listener) = listener {
            listener.on_event(&BroadcastEvent::new(Arc::clone(&self.source), kind));
        }
    }
}
