//! In-process document store
//!
//! Holds documents in a map keyed by collection path. Failure switches let
//! tests simulate an unreachable store or a single broken sub-collection.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;

use super::{CollectionPath, DocumentStore, StoreError};
use crate::table::Document;

/// Document store backed by a `HashMap`
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<CollectionPath, Vec<Document>>>,
    failing: RwLock<HashSet<String>>,
    unavailable: AtomicBool,
    list_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: add documents to a user's sub-collection
    pub fn with_documents(
        mut self,
        user_id: &str,
        subcollection: &str,
        documents: impl IntoIterator<Item = Document>,
    ) -> Self {
        self.collections
            .get_mut()
            .entry(CollectionPath::new(user_id, subcollection))
            .or_default()
            .extend(documents);
        self
    }

    /// Append documents to a user's sub-collection
    pub async fn insert(
        &self,
        user_id: &str,
        subcollection: &str,
        documents: impl IntoIterator<Item = Document>,
    ) {
        self.collections
            .write()
            .await
            .entry(CollectionPath::new(user_id, subcollection))
            .or_default()
            .extend(documents);
    }

    /// Make every call fail as if the store were unreachable
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make listing one sub-collection fail with an API error, for any user
    pub async fn fail_subcollection(&self, subcollection: &str) {
        self.failing.write().await.insert(subcollection.to_string());
    }

    /// Number of `list_documents` calls served so far
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store switched off".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn health_check(&self, _user_id: &str) -> Result<(), StoreError> {
        self.check_available()
    }

    async fn list_documents(&self, path: &CollectionPath) -> Result<Vec<Document>, StoreError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        if self.failing.read().await.contains(&path.subcollection) {
            return Err(StoreError::Api {
                status: 500,
                message: format!("listing {} failed", path),
            });
        }

        Ok(self
            .collections
            .read()
            .await
            .get(path)
            .cloned()
            .unwrap_or_default())
    }
}
