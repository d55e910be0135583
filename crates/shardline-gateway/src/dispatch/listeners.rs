//! Listener registry

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::client::Context;
use crate::events::{Event, EventType};

/// Boxed listener body
pub type Listener =
    Arc<dyn Fn(Context, Arc<Event>) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Handle returned on registration, used to unregister
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Listeners keyed by the event kind they subscribed to
#[derive(Default)]
pub struct ListenerRegistry {
    next_id: AtomicU64,
    listeners: RwLock<HashMap<EventType, Vec<(ListenerId, Listener)>>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` for `kind`
    pub fn on<F, Fut>(&self, kind: EventType, listener: F) -> ListenerId
    where
        F: Fn(Context, Arc<Event>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let listener: Listener = Arc::new(move |ctx, event| listener(ctx, event).boxed());
        self.listeners
            .write()
            .entry(kind)
            .or_default()
            .push((id, listener));
        tracing::debug!(event = %kind, listener = id.0, "Listener registered");
        id
    }

    /// Unregister; returns whether the id was registered
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        for entries in listeners.values_mut() {
            if let Some(index) = entries.iter().position(|(entry, _)| *entry == id) {
                entries.remove(index);
                return true;
            }
        }
        false
    }

    /// Snapshot of the listeners for `kind`
    pub fn listeners_for(&self, kind: EventType) -> Vec<Listener> {
        self.listeners
            .read()
            .get(&kind)
            .map(|entries| entries.iter().map(|(_, l)| Arc::clone(l)).collect())
            .unwrap_or_default()
    }

    pub fn count(&self, kind: EventType) -> usize {
        self.listeners.read().get(&kind).map_or(0, Vec::len)
    }
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let listeners = self.listeners.read();
        f.debug_struct("ListenerRegistry")
            .field("kinds", &listeners.len())
            .field("listeners", &listeners.values().map(Vec::len).sum::<usize>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_remove() {
        let registry = ListenerRegistry::new();
        let first = registry.on(EventType::MessageCreate, |_, _| async { Ok(()) });
        let second = registry.on(EventType::MessageCreate, |_, _| async { Ok(()) });
        registry.on(EventType::GuildCreate, |_, _| async { Ok(()) });

        assert_ne!(first, second);
        assert_eq!(registry.count(EventType::MessageCreate), 2);
        assert_eq!(registry.listeners_for(EventType::GuildCreate).len(), 1);
        assert!(registry.listeners_for(EventType::Ready).is_empty());

        assert!(registry.remove(first));
        assert!(!registry.remove(first));
        assert_eq!(registry.count(EventType::MessageCreate), 1);
    }
}
