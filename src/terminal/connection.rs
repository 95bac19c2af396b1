// ABOUTME: Connection handle abstraction shared by the websocket transport and test doubles
// Inbound listeners are registered per subscription and removed when the subscription drops

use crate::terminal::protocol::{ClientEvent, ServerEvent};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// Failures emitting on a connection
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConnectionError {
    /// The connection is closed
    #[error("Connection closed")]
    Closed,

    /// The transport rejected an event
    #[error("Failed to send {event}: {reason}")]
    Send { event: &'static str, reason: String },
}

/// A full-duplex event channel to a remote shell service. Owned by whoever
/// created it. Bridges only emit on it and subscribe to it.
pub trait TerminalConnection: Send + Sync {
    /// Queue an outbound event. Events are delivered in call order.
    fn emit(&self, event: ClientEvent) -> Result<(), ConnectionError>;

    /// Register an inbound listener. Dropping the subscription deregisters it.
    fn subscribe(&self) -> Subscription;
}

type ListenerMap = HashMap<u64, mpsc::UnboundedSender<ServerEvent>>;

#[derive(Default)]
struct RegistryInner {
    next_id: u64,
    listeners: ListenerMap,
}

/// Fan-out of inbound events to every live subscription
#[derive(Clone, Default)]
pub struct ListenerRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

impl ListenerRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new listener
    pub fn subscribe(&self) -> Subscription {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = {
            let mut inner = lock(&self.inner);
            let id = inner.next_id;
            inner.next_id += 1;
            inner.listeners.insert(id, sender);
            id
        };
        debug!("Registered terminal listener {}", id);

        Subscription {
            id,
            receiver,
            registry: Arc::downgrade(&self.inner),
        }
    }

    /// Deliver an event to every listener. Returns how many received it.
    pub fn dispatch(&self, event: &ServerEvent) -> usize {
        let mut inner = lock(&self.inner);
        // Receivers closed without going through Drop are pruned here
        inner
            .listeners
            .retain(|_, sender| sender.send(event.clone()).is_ok());
        trace!("Dispatched inbound event to {} listener(s)", inner.listeners.len());
        inner.listeners.len()
    }

    /// Number of live listeners
    pub fn listener_count(&self) -> usize {
        lock(&self.inner).listeners.len()
    }
}

/// Receiving end of one inbound listener
pub struct Subscription {
    id: u64,
    receiver: mpsc::UnboundedReceiver<ServerEvent>,
    registry: Weak<Mutex<RegistryInner>>,
}

impl Subscription {
    /// Registry-unique listener id
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Next queued event without waiting
    pub fn try_recv(&mut self) -> Option<ServerEvent> {
        self.receiver.try_recv().ok()
    }

    /// Wait for the next event. `None` once the connection side is gone.
    pub async fn recv(&mut self) -> Option<ServerEvent> {
        self.receiver.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.receiver.close();
        if let Some(inner) = self.registry.upgrade() {
            lock(&inner).listeners.remove(&self.id);
            debug!("Deregistered terminal listener {}", self.id);
        }
    }
}

fn lock(inner: &Mutex<RegistryInner>) -> MutexGuard<'_, RegistryInner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminal::protocol::TerminalFrame;

    fn text(s: &str) -> ServerEvent {
        ServerEvent::Terminal(TerminalFrame::Text(s.to_string()))
    }

    #[test]
    fn test_dispatch_reaches_every_subscription_in_order() {
        let registry = ListenerRegistry::new();
        let mut first = registry.subscribe();
        let mut second = registry.subscribe();
        assert_ne!(first.id(), second.id());

        assert_eq!(registry.dispatch(&text("a")), 2);
        assert_eq!(registry.dispatch(&text("b")), 2);

        assert_eq!(first.try_recv(), Some(text("a")));
        assert_eq!(first.try_recv(), Some(text("b")));
        assert_eq!(first.try_recv(), None);
        assert_eq!(second.try_recv(), Some(text("a")));
        assert_eq!(second.try_recv(), Some(text("b")));
    }

    #[test]
    fn test_dropping_subscription_deregisters() {
        let registry = ListenerRegistry::new();
        let subscription = registry.subscribe();
        assert_eq!(registry.listener_count(), 1);

        drop(subscription);
        assert_eq!(registry.listener_count(), 0);
        assert_eq!(registry.dispatch(&text("ignored")), 0);
    }

    #[test]
    fn test_subscription_outliving_registry() {
        let registry = ListenerRegistry::new();
        let subscription = registry.subscribe();
        drop(registry);
        // Must not panic when the registry is already gone
        drop(subscription);
    }
}
