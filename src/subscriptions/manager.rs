//! Listener registry and channel fan-out for change sets.

use crate::changes::RepositoryChanges;
use crossbeam_channel::{bounded, Sender};
use parking_lot::RwLock;
use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, warn};

use super::types::{
    ChangeListener, DropReason, ListenerId, RepositoryEvent, SubscriptionConfig,
    SubscriptionHandle, SubscriptionId,
};

/// Internal subscription state.
struct Subscription<T> {
    config: SubscriptionConfig,
    sender: Sender<RepositoryEvent<T>>,
}

impl<T> Subscription<T> {
    /// Try to send an event. Returns false if buffer is full or the receiver is gone.
    fn try_send(&self, event: RepositoryEvent<T>) -> bool {
        self.sender.try_send(event).is_ok()
    }
}

/// Manages listeners and channel subscriptions, and dispatches change sets.
///
/// Ids come from one counter, so `BTreeMap` iteration is registration order.
pub struct SubscriptionManager<T> {
    listeners: RwLock<BTreeMap<ListenerId, ChangeListener<T>>>,
    subscriptions: RwLock<BTreeMap<SubscriptionId, Subscription<T>>>,
    next_id: AtomicU64,
}

impl<T> SubscriptionManager<T> {
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(BTreeMap::new()),
            subscriptions: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    // --- Listeners ---

    /// Register a listener. Listeners run in registration order.
    pub fn on<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&RepositoryChanges<T>) + Send + Sync + 'static,
    {
        self.add(Arc::new(listener))
    }

    /// Register an already shared listener.
    pub fn add(&self, listener: ChangeListener<T>) -> ListenerId {
        let id = ListenerId(self.next_id());
        self.listeners.write().insert(id, listener);
        id
    }

    /// Unregister a listener. Returns false if it was not registered.
    pub fn off(&self, id: ListenerId) -> bool {
        self.listeners.write().remove(&id).is_some()
    }

    /// Unregister every listener and close every channel subscription.
    pub fn off_all(&self) {
        self.listeners.write().clear();

        let mut subs = self.subscriptions.write();
        for (_, sub) in std::mem::take(&mut *subs) {
            let _ = sub.sender.try_send(RepositoryEvent::Dropped {
                reason: DropReason::Closed,
            });
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    // --- Channel subscriptions ---

    /// Create a channel subscription.
    pub fn subscribe(&self, config: SubscriptionConfig) -> SubscriptionHandle<T> {
        let id = SubscriptionId(self.next_id());
        let (sender, receiver) = bounded(config.buffer_size);

        self.subscriptions
            .write()
            .insert(id, Subscription { config, sender });

        SubscriptionHandle { id, receiver }
    }

    /// Unsubscribe and clean up.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        let mut subs = self.subscriptions.write();
        if let Some(sub) = subs.remove(&id) {
            // Best effort
            let _ = sub.sender.try_send(RepositoryEvent::Dropped {
                reason: DropReason::Unsubscribed,
            });
        }
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.read().len()
    }

    // --- Dispatch ---

    /// Deliver a change set: listeners first, in registration order, then
    /// matching channel subscriptions.
    ///
    /// A panicking listener is logged and skipped; the rest still run.
    pub fn dispatch(&self, changes: RepositoryChanges<T>) {
        let changes = Arc::new(changes);

        // Snapshot the registry so listeners may call `on`/`off` re-entrantly.
        let listeners: Vec<(ListenerId, ChangeListener<T>)> = self
            .listeners
            .read()
            .iter()
            .map(|(id, l)| (*id, Arc::clone(l)))
            .collect();

        for (id, listener) in listeners {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| listener(changes.as_ref())));
            if let Err(payload) = outcome {
                error!(
                    listener = id.0,
                    panic = %panic_message(payload.as_ref()),
                    "change listener panicked"
                );
            }
        }

        self.broadcast(changes);
    }

    /// Send to matching subscriptions. Drops subscribers that fail to receive.
    fn broadcast(&self, changes: Arc<RepositoryChanges<T>>) {
        let mut to_remove = Vec::new();

        {
            let subs = self.subscriptions.read();
            for (id, sub) in subs.iter() {
                if sub.config.filter.matches(&changes)
                    && !sub.try_send(RepositoryEvent::Changes(Arc::clone(&changes)))
                {
                    to_remove.push(*id);
                }
            }
        }

        if !to_remove.is_empty() {
            let mut subs = self.subscriptions.write();
            for id in to_remove {
                if let Some(sub) = subs.remove(&id) {
                    warn!(subscription = id.0, "dropping slow subscriber");
                    // Might fail, that's ok
                    let _ = sub.sender.try_send(RepositoryEvent::Dropped {
                        reason: DropReason::BufferOverflow,
                    });
                }
            }
        }

        debug!(changed = changes.len(), "dispatched change set");
    }
}

impl<T> Default for SubscriptionManager<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
