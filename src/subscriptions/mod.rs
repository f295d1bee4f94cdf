//! Subscription system for repository change notifications.
//!
//! Two delivery paths share one registry:
//! - Listeners (`on` / `off`): callbacks run synchronously, in registration
//!   order, before the triggering operation returns
//! - Channel subscriptions (`subscribe` / `unsubscribe`): bounded buffers,
//!   slow subscribers are dropped
//!
//! # Example
//!
//! ```ignore
//! let id = repo.on(|changes| {
//!     for todo in changes.added() {
//!         println!("new: {}", todo.title);
//!     }
//! });
//!
//! let handle = repo.subscribe(SubscriptionConfig {
//!     filter: SubscriptionFilter::deleted(),
//!     ..Default::default()
//! });
//! while let Ok(RepositoryEvent::Changes(changes)) = handle.recv() {
//!     println!("{} removed", changes.deleted().len());
//! }
//!
//! repo.off(id);
//! ```

mod manager;
mod types;

pub use manager::SubscriptionManager;
pub use types::{
    ChangeListener, DropReason, ListenerId, RepositoryEvent, SubscriptionConfig,
    SubscriptionFilter, SubscriptionHandle, SubscriptionId,
};
