//! Repository contract and its mapping/diffing implementation.

use crate::backend::{BackendAdapter, PersistIntent};
use crate::changes::{diff, RepositoryChanges, Snapshot};
use crate::error::{MappingError, RepositoryError, Result};
use crate::mapping::{field_value, EntityMapping};
use crate::subscriptions::{
    ChangeListener, ListenerId, SubscriptionConfig, SubscriptionHandle, SubscriptionId,
    SubscriptionManager,
};
use crate::types::Entity;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// How the snapshot is brought up to date after a write.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WriteRefresh {
    /// Fetch the whole collection again and diff it. Picks up changes made
    /// by other clients of the same storage.
    #[default]
    Refetch,

    /// Apply the written entity to the snapshot without another fetch.
    Local,
}

/// Repository configuration.
#[derive(Clone, Debug)]
pub struct RepositoryConfig {
    /// Whether `find_all` diffs against the snapshot and publishes changes.
    pub refresh_on_find_all: bool,

    /// Publish change sets that have no added, modified or deleted entries.
    pub emit_empty_changes: bool,

    /// Snapshot refresh strategy after `create`, `update` and `remove`.
    pub write_refresh: WriteRefresh,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            refresh_on_find_all: true,
            emit_empty_changes: false,
            write_refresh: WriteRefresh::Refetch,
        }
    }
}

/// Uniform CRUD and change-notification surface over any backend.
#[async_trait]
pub trait EntityRepository<T: Entity>: Send + Sync {
    /// Every entity, in backend order.
    async fn find_all(&self) -> Result<Vec<T>>;

    /// First entity whose `field` equals `value`.
    ///
    /// `value` is compared against the entity's serialized field; `null`
    /// matches an absent field.
    async fn find_by(&self, field: &str, value: Value) -> Result<Option<T>>;

    /// Persist a new entity and return it with its assigned identity.
    async fn create(&self, entity: &T) -> Result<T>;

    /// Persist changes to an existing entity.
    async fn update(&self, entity: &T) -> Result<T>;

    /// Delete an existing entity.
    async fn remove(&self, entity: &T) -> Result<()>;

    /// Register a change listener.
    fn add_listener(&self, listener: ChangeListener<T>) -> ListenerId;

    /// Register a change listener from a closure.
    fn on<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&RepositoryChanges<T>) + Send + Sync + 'static,
        Self: Sized,
    {
        self.add_listener(Arc::new(listener))
    }

    /// Unregister a listener. Returns false if it was not registered.
    fn off(&self, id: ListenerId) -> bool;

    /// Release every listener and channel subscription.
    fn off_all(&self);

    /// Receive change sets over a bounded channel.
    fn subscribe(&self, config: SubscriptionConfig) -> SubscriptionHandle<T>;

    fn unsubscribe(&self, id: SubscriptionId);
}

/// A repository composing an [`EntityMapping`], a [`BackendAdapter`] and
/// change detection.
///
/// Operations are serialized: each one holds the snapshot lock from its
/// first backend call until its change set has been dispatched.
pub struct Repository<T: Entity, B: BackendAdapter> {
    backend: B,
    mapping: Arc<EntityMapping<T>>,
    config: RepositoryConfig,
    snapshot: Mutex<Snapshot<T>>,
    subscriptions: SubscriptionManager<T>,
}

/// A write to fold into the snapshot under [`WriteRefresh::Local`].
enum LocalWrite<T> {
    Upsert(T),
    Remove(String),
}

impl<T: Entity, B: BackendAdapter> Repository<T, B> {
    /// Create a repository with default configuration.
    pub fn new(backend: B, mapping: Arc<EntityMapping<T>>) -> Result<Self> {
        Self::with_config(backend, mapping, RepositoryConfig::default())
    }

    /// Create a repository.
    ///
    /// Fails if the backend stores identity under a different resource key
    /// than the mapping declares.
    pub fn with_config(
        backend: B,
        mapping: Arc<EntityMapping<T>>,
        config: RepositoryConfig,
    ) -> Result<Self> {
        if backend.identity_key() != mapping.resource_identity_key() {
            return Err(MappingError::InvalidIdentity {
                field: mapping.identity_field().to_string(),
                reason: format!(
                    "mapped to `{}` but the backend stores identity under `{}`",
                    mapping.resource_identity_key(),
                    backend.identity_key()
                ),
            }
            .into());
        }

        Ok(Self {
            backend,
            mapping,
            config,
            snapshot: Mutex::new(Snapshot::empty()),
            subscriptions: SubscriptionManager::new(),
        })
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn mapping(&self) -> &EntityMapping<T> {
        &self.mapping
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    /// Fetch and map the whole collection.
    async fn fetch_all(&self) -> Result<Vec<T>> {
        let resources = self.backend.fetch_resources().await?;
        let entities = resources
            .iter()
            .map(|r| self.mapping.from_resource(r))
            .collect::<std::result::Result<Vec<T>, _>>()?;

        if entities.iter().any(|e| e.id().is_none()) {
            return Err(RepositoryError::MissingIdentity);
        }
        Ok(entities)
    }

    /// Diff `current` against the snapshot, replace it and publish.
    fn commit(&self, snapshot: &mut Snapshot<T>, current: Vec<T>) {
        let result = diff(snapshot, current, |e: &T| {
            e.id().unwrap_or_default().to_string()
        });
        *snapshot = result.snapshot;

        if !result.changes.is_empty() || self.config.emit_empty_changes {
            self.subscriptions.dispatch(result.changes);
        }
    }

    /// Bring the snapshot up to date after a write the backend accepted.
    ///
    /// The write is already durable, so a failed refetch falls back to
    /// applying it locally instead of failing the operation.
    async fn refresh_after_write(&self, snapshot: &mut Snapshot<T>, write: LocalWrite<T>) {
        let current = match self.config.write_refresh {
            WriteRefresh::Refetch => match self.fetch_all().await {
                Ok(current) => current,
                Err(e) => {
                    warn!(error = %e, "refetch after write failed, applying write locally");
                    project(snapshot, write)
                }
            },
            WriteRefresh::Local => project(snapshot, write),
        };
        self.commit(snapshot, current);
    }
}

/// Snapshot contents with one write applied, in snapshot order.
fn project<T: Entity>(snapshot: &Snapshot<T>, write: LocalWrite<T>) -> Vec<T> {
    match write {
        LocalWrite::Upsert(entity) => {
            let mut current: Vec<T> = snapshot.values().cloned().collect();
            match current.iter_mut().find(|e| e.id() == entity.id()) {
                Some(slot) => *slot = entity,
                None => current.push(entity),
            }
            current
        }
        LocalWrite::Remove(id) => snapshot
            .values()
            .filter(|e| e.id() != Some(id.as_str()))
            .cloned()
            .collect(),
    }
}

#[async_trait]
impl<T: Entity, B: BackendAdapter> EntityRepository<T> for Repository<T, B> {
    async fn find_all(&self) -> Result<Vec<T>> {
        let mut snapshot = self.snapshot.lock().await;
        let entities = self.fetch_all().await?;
        debug!(count = entities.len(), "fetched collection");

        if self.config.refresh_on_find_all {
            self.commit(&mut snapshot, entities.clone());
        }
        Ok(entities)
    }

    async fn find_by(&self, field: &str, value: Value) -> Result<Option<T>> {
        if self.mapping.property(field).is_none() {
            return Err(RepositoryError::UnknownField(field.to_string()));
        }

        if field == self.mapping.identity_field() {
            let id = match &value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                _ => return Ok(None),
            };
            let _serialized = self.snapshot.lock().await;
            let found = self.backend.fetch_resource(&id).await?;
            return match found {
                Some(resource) => Ok(Some(self.mapping.from_resource(&resource)?)),
                None => Ok(None),
            };
        }

        for entity in self.find_all().await? {
            let actual = field_value(&entity, field)?.unwrap_or(Value::Null);
            if actual == value {
                return Ok(Some(entity));
            }
        }
        Ok(None)
    }

    async fn create(&self, entity: &T) -> Result<T> {
        let mut snapshot = self.snapshot.lock().await;

        let resource = self.mapping.to_resource(entity)?;
        let stored = self
            .backend
            .persist_resource(resource, PersistIntent::Create)
            .await?;
        let created = self.mapping.from_resource(&stored)?;
        if created.id().is_none() {
            return Err(RepositoryError::MissingIdentity);
        }
        debug!(id = created.id(), "created entity");

        self.refresh_after_write(&mut snapshot, LocalWrite::Upsert(created.clone()))
            .await;
        Ok(created)
    }

    async fn update(&self, entity: &T) -> Result<T> {
        if entity.id().is_none() {
            return Err(RepositoryError::MissingIdentity);
        }
        let mut snapshot = self.snapshot.lock().await;

        let resource = self.mapping.to_resource(entity)?;
        let stored = self
            .backend
            .persist_resource(resource, PersistIntent::Update)
            .await?;
        let updated = self.mapping.from_resource(&stored)?;
        debug!(id = updated.id(), "updated entity");

        self.refresh_after_write(&mut snapshot, LocalWrite::Upsert(updated.clone()))
            .await;
        Ok(updated)
    }

    async fn remove(&self, entity: &T) -> Result<()> {
        let id = entity
            .id()
            .ok_or(RepositoryError::MissingIdentity)?
            .to_string();
        let mut snapshot = self.snapshot.lock().await;

        self.backend.delete_resource(&id).await?;
        debug!(id = %id, "removed entity");

        self.refresh_after_write(&mut snapshot, LocalWrite::Remove(id))
            .await;
        Ok(())
    }

    fn add_listener(&self, listener: ChangeListener<T>) -> ListenerId {
        self.subscriptions.add(listener)
    }

    fn off(&self, id: ListenerId) -> bool {
        self.subscriptions.off(id)
    }

    fn off_all(&self) {
        self.subscriptions.off_all()
    }

    fn subscribe(&self, config: SubscriptionConfig) -> SubscriptionHandle<T> {
        self.subscriptions.subscribe(config)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.subscriptions.unsubscribe(id)
    }
}
