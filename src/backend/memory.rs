//! In-process backend.

use super::{BackendAdapter, PersistIntent};
use crate::error::BackendError;
use crate::types::Resource;
use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::debug;

/// Backend holding resources in memory, in insertion order.
///
/// Identities are assigned sequentially as text: `"1"`, `"2"`, ...
pub struct MemoryBackend {
    identity_key: String,
    state: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    resources: IndexMap<String, Resource>,
    next_id: u64,
    offline: bool,
}

impl MemoryState {
    fn check_online(&self) -> Result<(), BackendError> {
        if self.offline {
            Err(BackendError::Unavailable("memory backend is offline".into()))
        } else {
            Ok(())
        }
    }

    fn assign_id(&mut self) -> String {
        loop {
            self.next_id += 1;
            let id = self.next_id.to_string();
            if !self.resources.contains_key(&id) {
                return id;
            }
        }
    }

    fn insert_new(&mut self, identity_key: &str, mut resource: Resource) -> String {
        let id = match resource.identity(identity_key) {
            Some(id) => id,
            None => {
                let id = self.assign_id();
                resource.insert(identity_key, Value::String(id.clone()));
                id
            }
        };
        self.resources.insert(id.clone(), resource);
        id
    }
}

impl MemoryBackend {
    /// Empty backend storing identity under `"id"`.
    pub fn new() -> Self {
        Self::with_identity_key("id")
    }

    pub fn with_identity_key(key: impl Into<String>) -> Self {
        Self {
            identity_key: key.into(),
            state: Mutex::new(MemoryState::default()),
        }
    }

    /// Insert a resource behind the repository's back, as another client of
    /// the same storage would. Returns its identity.
    pub fn insert_external(&self, resource: Resource) -> String {
        self.state.lock().insert_new(&self.identity_key, resource)
    }

    /// Replace or remove a resource behind the repository's back.
    pub fn replace_external(&self, id: &str, resource: Option<Resource>) {
        let mut state = self.state.lock();
        match resource {
            Some(resource) => {
                state.resources.insert(id.to_string(), resource);
            }
            None => {
                state.resources.shift_remove(id);
            }
        }
    }

    /// While offline every operation fails with `BackendError::Unavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.state.lock().offline = offline;
    }

    pub fn len(&self) -> usize {
        self.state.lock().resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BackendAdapter for MemoryBackend {
    fn identity_key(&self) -> &str {
        &self.identity_key
    }

    async fn fetch_resources(&self) -> Result<Vec<Resource>, BackendError> {
        let state = self.state.lock();
        state.check_online()?;
        Ok(state.resources.values().cloned().collect())
    }

    async fn fetch_resource(&self, id: &str) -> Result<Option<Resource>, BackendError> {
        let state = self.state.lock();
        state.check_online()?;
        Ok(state.resources.get(id).cloned())
    }

    async fn persist_resource(
        &self,
        resource: Resource,
        intent: PersistIntent,
    ) -> Result<Resource, BackendError> {
        let mut state = self.state.lock();
        state.check_online()?;

        match intent {
            PersistIntent::Create => {
                if let Some(id) = resource.identity(&self.identity_key) {
                    if state.resources.contains_key(&id) {
                        return Err(BackendError::Conflict(id));
                    }
                }
                let id = state.insert_new(&self.identity_key, resource);
                debug!(id = %id, "memory backend created resource");
                Ok(state.resources[&id].clone())
            }
            PersistIntent::Update => {
                let id = resource
                    .identity(&self.identity_key)
                    .ok_or_else(|| BackendError::NotFound("<no identity>".into()))?;
                let slot = state
                    .resources
                    .get_mut(&id)
                    .ok_or_else(|| BackendError::NotFound(id.clone()))?;
                *slot = resource;
                debug!(id = %id, "memory backend updated resource");
                Ok(slot.clone())
            }
        }
    }

    async fn delete_resource(&self, id: &str) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        state.check_online()?;
        state
            .resources
            .shift_remove(id)
            .map(|_| ())
            .ok_or_else(|| BackendError::NotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_create_assigns_sequential_ids() {
        let backend = MemoryBackend::new();
        let first = backend
            .persist_resource(Resource::new().with("summary", "a"), PersistIntent::Create)
            .await
            .unwrap();
        let second = backend
            .persist_resource(Resource::new().with("summary", "b"), PersistIntent::Create)
            .await
            .unwrap();

        assert_eq!(first.get("id"), Some(&json!("1")));
        assert_eq!(second.get("id"), Some(&json!("2")));
        assert_eq!(backend.len(), 2);
    }

    #[tokio::test]
    async fn test_create_skips_taken_ids() {
        let backend = MemoryBackend::new();
        backend.insert_external(Resource::new().with("id", "1"));
        let created = backend
            .persist_resource(Resource::new(), PersistIntent::Create)
            .await
            .unwrap();
        assert_eq!(created.identity("id").as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_create_with_existing_id_conflicts() {
        let backend = MemoryBackend::new();
        backend.insert_external(Resource::new().with("id", "x"));
        let result = backend
            .persist_resource(Resource::new().with("id", "x"), PersistIntent::Create)
            .await;
        assert!(matches!(result, Err(BackendError::Conflict(id)) if id == "x"));
    }

    #[tokio::test]
    async fn test_update_unknown_is_not_found() {
        let backend = MemoryBackend::new();
        let result = backend
            .persist_resource(Resource::new().with("id", "9"), PersistIntent::Update)
            .await;
        assert!(matches!(result, Err(BackendError::NotFound(id)) if id == "9"));
    }

    #[tokio::test]
    async fn test_delete_keeps_order_of_the_rest() {
        let backend = MemoryBackend::with_identity_key("row");
        for name in ["a", "b", "c"] {
            backend.insert_external(Resource::new().with("name", name));
        }
        backend.delete_resource("2").await.unwrap();

        let names: Vec<Value> = backend
            .fetch_resources()
            .await
            .unwrap()
            .iter()
            .map(|r| r.get("name").cloned().unwrap())
            .collect();
        assert_eq!(names, vec![json!("a"), json!("c")]);
        assert!(matches!(
            backend.delete_resource("2").await,
            Err(BackendError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_offline_fails_every_operation() {
        let backend = MemoryBackend::new();
        backend.set_offline(true);
        assert!(matches!(
            backend.fetch_resources().await,
            Err(BackendError::Unavailable(_))
        ));
        assert!(backend.delete_resource("1").await.is_err());
        backend.set_offline(false);
        assert!(backend.fetch_resources().await.unwrap().is_empty());
    }
}
