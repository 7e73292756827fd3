//! Record fetching
//!
//! Pulls one category's documents for one user and assembles them into a
//! `Table`.

use std::sync::Arc;

use super::{CollectionPath, DocumentStore, StoreError};
use crate::category::Category;
use crate::table::Table;

/// Fetch every document of `category` for `user_id` as a table
///
/// An empty sub-collection yields an empty table.
pub async fn fetch_table(
    store: &dyn DocumentStore,
    category: Category,
    user_id: &str,
) -> Result<Table, StoreError> {
    let path = CollectionPath::new(user_id, category.subcollection());
    let documents = store.list_documents(&path).await?;
    tracing::info!("Fetched {} docs from {}", documents.len(), path);
    Ok(Table::from_documents(documents))
}

/// Fetches category tables from a shared store
#[derive(Clone)]
pub struct RecordFetcher {
    store: Arc<dyn DocumentStore>,
}

impl RecordFetcher {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }

    pub async fn fetch(&self, category: Category, user_id: &str) -> Result<Table, StoreError> {
        fetch_table(self.store.as_ref(), category, user_id).await
    }

    /// Fetch all four categories in processing order
    pub async fn fetch_all(&self, user_id: &str) -> Result<Vec<(Category, Table)>, StoreError> {
        let mut tables = Vec::with_capacity(4);
        for category in Category::all() {
            tables.push((category, self.fetch(category, user_id).await?));
        }
        Ok(tables)
    }
}
