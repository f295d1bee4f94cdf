//! # Entity Repository
//!
//! Storage-agnostic repositories: one CRUD and change-notification contract
//! over spreadsheets, calendars, in-memory stores or anything else that can
//! list, write and delete records.
//!
//! ## Core Concepts
//!
//! - **Entities**: Plain application records with a backend-assigned identity
//! - **Mappings**: Per-field resource key, coercion type and optionality
//! - **Backends**: Adapters that move raw resources in and out of storage
//! - **Changes**: `added` / `modified` / `deleted` sets derived by diffing
//!   each refresh against the last snapshot
//!
//! ## Example
//!
//! ```ignore
//! use entity_repo::{EntityMapping, EntityRepository, MemoryBackend, PropertyMapping, Repository};
//!
//! let mapping = EntityMapping::<Todo>::builder()
//!     .field("id", PropertyMapping::string("id").optional())
//!     .field("title", PropertyMapping::string("summary"))
//!     .field("done", PropertyMapping::boolean("status"))
//!     .build()?;
//!
//! let repo = Repository::new(MemoryBackend::new(), Arc::new(mapping))?;
//! repo.on(|changes| println!("{} changed", changes.len()));
//!
//! let todo = repo.create(&Todo { id: None, title: "Buy milk".into(), done: false }).await?;
//! repo.update(&Todo { done: true, ..todo }).await?;
//! ```

pub mod backend;
pub mod changes;
pub mod error;
pub mod logging;
pub mod mapping;
pub mod repository;
pub mod subscriptions;
pub mod types;

// Re-exports
pub use backend::{BackendAdapter, MemoryBackend, PersistIntent};
pub use changes::{diff, Diff, RepositoryChanges, Snapshot};
pub use error::{BackendError, Direction, MappingError, RepositoryError, Result};
pub use mapping::{DateFormat, EntityMapping, EntityMappingBuilder, PropertyMapping};
pub use repository::{EntityRepository, Repository, RepositoryConfig, WriteRefresh};
pub use subscriptions::{
    ChangeListener, DropReason, ListenerId, RepositoryEvent, SubscriptionConfig,
    SubscriptionFilter, SubscriptionHandle, SubscriptionId, SubscriptionManager,
};
pub use types::{Entity, PropertyType, Resource};
