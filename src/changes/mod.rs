//! Change detection between successive views of a collection.
//!
//! Backends are not expected to provide change feeds. Instead a repository
//! keeps a [`Snapshot`] of what it last saw and, whenever the collection is
//! refreshed, runs [`diff`] to derive the `added` / `modified` / `deleted`
//! sets it publishes.

mod detector;
mod snapshot;

pub use detector::{diff, Diff};
pub use snapshot::{RepositoryChanges, Snapshot};
