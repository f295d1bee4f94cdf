//! Backend adapter port.
//!
//! A backend adapter is the only place that talks to real storage: a sheet,
//! a calendar, a table, an in-process map. It deals in raw [`Resource`]s;
//! type coercion and change detection happen in the repository.

mod memory;

pub use memory::MemoryBackend;

use crate::error::BackendError;
use crate::types::Resource;
use async_trait::async_trait;

/// Why a resource is being persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PersistIntent {
    /// A new resource; the backend assigns identity if none is given.
    Create,
    /// Replace an existing resource identified by its identity key.
    Update,
}

/// Storage primitives a repository needs from a backend.
#[async_trait]
pub trait BackendAdapter: Send + Sync {
    /// Resource key under which this backend stores identity.
    fn identity_key(&self) -> &str {
        "id"
    }

    /// Every resource, in backend order.
    async fn fetch_resources(&self) -> Result<Vec<Resource>, BackendError>;

    /// Look a single resource up by identity.
    ///
    /// The default scans [`fetch_resources`](Self::fetch_resources); backends
    /// with a native index should override it.
    async fn fetch_resource(&self, id: &str) -> Result<Option<Resource>, BackendError> {
        let resources = self.fetch_resources().await?;
        let key = self.identity_key();
        Ok(resources
            .into_iter()
            .find(|r| r.identity(key).as_deref() == Some(id)))
    }

    /// Write a resource and return it as stored, including backend-assigned
    /// fields such as identity.
    async fn persist_resource(
        &self,
        resource: Resource,
        intent: PersistIntent,
    ) -> Result<Resource, BackendError>;

    /// Delete the resource with the given identity.
    async fn delete_resource(&self, id: &str) -> Result<(), BackendError>;
}
