//! Document store access
//!
//! Health-log records live under `users/{uid}/{sub-collection}` in a
//! document store. This module provides:
//! - `DocumentStore`: the read contract every backend implements
//! - `FirestoreStore`: Firestore REST API (production, emulator)
//! - `SnapshotStore`: JSON snapshot file (offline runs)
//! - `MemoryStore`: in-process store (tests, benches)
//! - `RecordFetcher`: turns a category's documents into a `Table`

mod error;
mod fetch;
mod firestore;
mod memory;
mod snapshot;

pub use error::StoreError;
pub use fetch::{fetch_table, RecordFetcher};
pub use firestore::{FirestoreConfig, FirestoreStore};
pub use memory::MemoryStore;
pub use snapshot::SnapshotStore;

use async_trait::async_trait;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::config::{StoreBackend, StoreConfig};
use crate::table::Document;

/// Path of one user's sub-collection, `users/{uid}/{sub}`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionPath {
    pub user_id: String,
    pub subcollection: String,
}

impl CollectionPath {
    pub fn new(user_id: impl Into<String>, subcollection: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            subcollection: subcollection.into(),
        }
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "users/{}/{}", self.user_id, self.subcollection)
    }
}

/// Read access to a document store
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &str;

    /// Verify the store is reachable and accepts our credentials for
    /// `user_id`'s data
    async fn health_check(&self, user_id: &str) -> Result<(), StoreError>;

    /// Every document of one collection
    ///
    /// A collection with no documents is an empty vector, not an error.
    /// Store-native timestamps come back as `Scalar::Timestamp`.
    async fn list_documents(&self, path: &CollectionPath) -> Result<Vec<Document>, StoreError>;
}

/// Construct the configured backend
pub async fn build_store(config: &StoreConfig) -> Result<Arc<dyn DocumentStore>, StoreError> {
    let store: Arc<dyn DocumentStore> = match config.backend {
        StoreBackend::Firestore => {
            Arc::new(FirestoreStore::new(FirestoreConfig::from_store_config(config))?)
        }
        StoreBackend::Snapshot => {
            let path = config.snapshot_path.as_deref().ok_or_else(|| {
                StoreError::Config("store.snapshot_path is required for the snapshot backend".into())
            })?;
            Arc::new(SnapshotStore::open(Path::new(path)).await?)
        }
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
    };

    tracing::info!(backend = store.name(), "Document store ready");
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_path_display() {
        let path = CollectionPath::new("u1", "stimmungen");
        assert_eq!(path.to_string(), "users/u1/stimmungen");
    }

    #[tokio::test]
    async fn test_build_memory_store() {
        let config = StoreConfig {
            backend: StoreBackend::Memory,
            ..StoreConfig::default()
        };
        let store = build_store(&config).await.unwrap();
        assert_eq!(store.name(), "memory");
        store.health_check("u1").await.unwrap();
    }

    #[tokio::test]
    async fn test_snapshot_backend_requires_path() {
        let config = StoreConfig {
            backend: StoreBackend::Snapshot,
            ..StoreConfig::default()
        };
        let err = build_store(&config).await.err().unwrap();
        assert!(matches!(err, StoreError::Config(_)));
    }

    #[tokio::test]
    async fn test_firestore_backend_requires_project() {
        let err = build_store(&StoreConfig::default()).await.err().unwrap();
        assert!(matches!(err, StoreError::Config(_)));
    }
}
