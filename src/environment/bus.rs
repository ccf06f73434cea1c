//! Cross-document message bus
//!
//! Listeners are registered with [`MessageBus::subscribe`] and stay
//! registered until they return [`ListenerControl::Remove`] from a delivery
//! or their [`Subscription`] is cancelled. The host feeds events with
//! [`MessageBus::dispatch`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use super::WindowHandle;

/// A message posted to this document by another window or frame
#[derive(Clone)]
pub struct MessageEvent {
    /// Serialized origin of the sender, e.g. `https://pocketfulofquarters.com`
    pub origin: String,
    /// Raw message data
    pub data: String,
    /// Sending window, when it can be closed
    pub source: Option<Arc<dyn WindowHandle>>,
}

impl MessageEvent {
    /// Create an event without a source window
    pub fn new(origin: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            data: data.into(),
            source: None,
        }
    }

    /// Attach the sending window
    #[must_use]
    pub fn with_source(mut self, source: Arc<dyn WindowHandle>) -> Self {
        self.source = Some(source);
        self
    }
}

impl std::fmt::Debug for MessageEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageEvent")
            .field("origin", &self.origin)
            .field("data", &self.data)
            .field("source", &self.source.as_ref().map(|_| "<window>"))
            .finish()
    }
}

/// What a listener wants after handling an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerControl {
    /// Keep receiving events
    Continue,
    /// Deregister this listener
    Remove,
}

type Listener = Arc<dyn Fn(&MessageEvent) -> ListenerControl + Send + Sync>;

#[derive(Default)]
struct BusInner {
    next_id: AtomicU64,
    listeners: Mutex<Vec<(u64, Listener)>>,
}

impl BusInner {
    fn remove(&self, id: u64) -> bool {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }

    fn contains(&self, id: u64) -> bool {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|(listener_id, _)| *listener_id == id)
    }
}

/// Message bus shared between the host and the authorization channel
///
/// Cloning is cheap; clones share the same listeners.
#[derive(Clone, Default)]
pub struct MessageBus {
    inner: Arc<BusInner>,
}

impl MessageBus {
    /// Create an empty bus
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for every subsequent event
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&MessageEvent) -> ListenerControl + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(listener)));
        tracing::trace!(subscription = id, "Message listener registered");

        Subscription {
            id,
            bus: Arc::downgrade(&self.inner),
        }
    }

    /// Deliver an event to every registered listener
    ///
    /// Listeners run outside the registry lock, so they may subscribe or
    /// cancel freely. Returns the number of listeners invoked.
    pub fn dispatch(&self, event: &MessageEvent) -> usize {
        let snapshot: Vec<(u64, Listener)> = self
            .inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let mut finished = Vec::new();
        for (id, listener) in &snapshot {
            if listener(event) == ListenerControl::Remove {
                finished.push(*id);
            }
        }

        for id in finished {
            self.inner.remove(id);
            tracing::trace!(subscription = id, "Message listener deregistered");
        }

        snapshot.len()
    }

    /// Number of registered listeners
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl std::fmt::Debug for MessageBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageBus")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Handle to a registered listener
///
/// Dropping the handle does not deregister the listener; call
/// [`Subscription::cancel`] for that.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    bus: Weak<BusInner>,
}

impl Subscription {
    /// Listener id, unique per bus
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Whether the listener is still registered
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.bus.upgrade().is_some_and(|bus| bus.contains(self.id))
    }

    /// Deregister the listener; returns `false` if it was already gone
    pub fn cancel(&self) -> bool {
        self.bus.upgrade().is_some_and(|bus| bus.remove(self.id))
    }
}
