//! Subscription types for change notifications.

use crate::changes::RepositoryChanges;
use std::sync::Arc;

/// Callback invoked with every published change set.
pub type ChangeListener<T> = Arc<dyn Fn(&RepositoryChanges<T>) + Send + Sync>;

/// Identifies a registered listener; pass it to `off` to unregister.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(pub u64);

/// Unique identifier for a channel subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(pub u64);

/// Configuration for a channel subscription.
#[derive(Clone, Debug)]
pub struct SubscriptionConfig {
    /// Max buffered events before dropping the subscriber.
    /// Default: 1000
    pub buffer_size: usize,

    /// Which change sets to deliver.
    pub filter: SubscriptionFilter,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            buffer_size: 1000,
            filter: SubscriptionFilter::all(),
        }
    }
}

/// Delivers a change set when it contains any of the included kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubscriptionFilter {
    pub include_added: bool,
    pub include_modified: bool,
    pub include_deleted: bool,
}

impl SubscriptionFilter {
    /// Every change set.
    pub fn all() -> Self {
        Self {
            include_added: true,
            include_modified: true,
            include_deleted: true,
        }
    }

    pub fn added() -> Self {
        Self {
            include_added: true,
            include_modified: false,
            include_deleted: false,
        }
    }

    pub fn modified() -> Self {
        Self {
            include_added: false,
            include_modified: true,
            include_deleted: false,
        }
    }

    pub fn deleted() -> Self {
        Self {
            include_added: false,
            include_modified: false,
            include_deleted: true,
        }
    }

    pub(crate) fn matches<T>(&self, changes: &RepositoryChanges<T>) -> bool {
        // An empty set is only published when the repository is configured
        // to emit them; deliver it to unfiltered subscribers.
        if changes.is_empty() {
            return *self == Self::all();
        }
        (self.include_added && !changes.added().is_empty())
            || (self.include_modified && !changes.modified().is_empty())
            || (self.include_deleted && !changes.deleted().is_empty())
    }
}

impl Default for SubscriptionFilter {
    fn default() -> Self {
        Self::all()
    }
}

/// Events delivered to channel subscribers.
#[derive(Debug)]
pub enum RepositoryEvent<T> {
    /// The collection changed.
    Changes(Arc<RepositoryChanges<T>>),

    /// Subscription was dropped; no further events follow.
    Dropped { reason: DropReason },
}

impl<T> Clone for RepositoryEvent<T> {
    fn clone(&self) -> Self {
        match self {
            RepositoryEvent::Changes(changes) => RepositoryEvent::Changes(Arc::clone(changes)),
            RepositoryEvent::Dropped { reason } => RepositoryEvent::Dropped {
                reason: reason.clone(),
            },
        }
    }
}

/// Why a subscription was dropped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DropReason {
    /// Send buffer overflowed (slow consumer).
    BufferOverflow,
    /// Explicitly unsubscribed.
    Unsubscribed,
    /// Every subscription was released at once.
    Closed,
}

/// Handle to a channel subscription.
pub struct SubscriptionHandle<T> {
    pub id: SubscriptionId,
    /// Channel to receive events.
    pub receiver: crossbeam_channel::Receiver<RepositoryEvent<T>>,
}

impl<T> SubscriptionHandle<T> {
    /// Receive the next event (blocking).
    pub fn recv(&self) -> Result<RepositoryEvent<T>, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive an event (non-blocking).
    pub fn try_recv(&self) -> Result<RepositoryEvent<T>, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(
        &self,
        timeout: std::time::Duration,
    ) -> Result<RepositoryEvent<T>, crossbeam_channel::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}
