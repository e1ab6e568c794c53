//! Document store boundary.
//!
//! Inventory data lives in an external search index reachable over HTTP.
//! This module defines the narrow contract the pipeline needs — insert,
//! exact-field query, free-text query, update, delete, plus index admin —
//! and two implementations: [`HttpDocStore`] speaking an
//! Elasticsearch-compatible API, and [`MemoryStore`] backing tests and
//! local development.
//!
//! Store handles are plain values passed into each component at
//! construction; nothing opens a connection at import time.

mod http;
mod memory;

pub use http::HttpDocStore;
pub use memory::MemoryStore;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

/// One matching document from a query.
#[derive(Debug, Clone)]
pub struct Hit {
    /// Store-assigned document id, usable with `update`/`delete`.
    pub id: String,
    /// The raw document body.
    pub source: Value,
}

impl Hit {
    /// Convenience accessor for a string field of the document.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.source.get(name).and_then(Value::as_str)
    }
}

/// The document store contract.
///
/// Writes are independent per document — there are no cross-document
/// transactions, which is why the pipeline relies on category-scoped
/// delete-then-insert rather than locking.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert one document, returning the store-assigned id.
    async fn insert(&self, index: &str, doc: &Value) -> Result<String>;

    /// Exact-match query on a single field.
    async fn find_by_field(&self, index: &str, field: &str, value: &str) -> Result<Vec<Hit>>;

    /// Free-text query across all fields.
    async fn search(&self, index: &str, query: &str) -> Result<Vec<Hit>>;

    /// Partial update of an existing document.
    async fn update(&self, index: &str, id: &str, updates: &Value) -> Result<()>;

    /// Delete one document by id. Deleting a document that no longer
    /// exists is not an error.
    async fn delete(&self, index: &str, id: &str) -> Result<()>;

    /// Create an index, configuring its text analysis settings.
    async fn create_index(&self, index: &str) -> Result<()>;

    /// Drop an index and everything in it.
    async fn delete_index(&self, index: &str) -> Result<()>;
}

/// Delete every document in `index` whose `hostname` field matches, then
/// insert `docs` fresh. This is the replace-on-refresh primitive every
/// category rediscovery goes through; running it twice with the same rows
/// leaves the same final set.
///
/// Returns `(deleted, inserted)` counts.
pub async fn replace_rows(
    store: &dyn DocumentStore,
    index: &str,
    hostname: &str,
    docs: &[Value],
) -> Result<(usize, usize)> {
    let stale = store.find_by_field(index, "hostname", hostname).await?;
    for hit in &stale {
        store.delete(index, &hit.id).await?;
    }

    for doc in docs {
        store.insert(index, doc).await?;
    }

    Ok((stale.len(), docs.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn replace_rows_is_idempotent() {
        let store = MemoryStore::new();
        let rows = vec![
            json!({"hostname": "sw1", "name": "Ethernet1"}),
            json!({"hostname": "sw1", "name": "Ethernet2"}),
        ];

        let (deleted, inserted) = replace_rows(&store, "interfaces", "sw1", &rows).await.unwrap();
        assert_eq!((deleted, inserted), (0, 2));

        let (deleted, inserted) = replace_rows(&store, "interfaces", "sw1", &rows).await.unwrap();
        assert_eq!((deleted, inserted), (2, 2));

        let hits = store
            .find_by_field("interfaces", "hostname", "sw1")
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[tokio::test]
    async fn replace_rows_leaves_other_hostnames_alone() {
        let store = MemoryStore::new();
        store
            .insert("interfaces", &json!({"hostname": "sw2", "name": "Ethernet9"}))
            .await
            .unwrap();

        replace_rows(
            &store,
            "interfaces",
            "sw1",
            &[json!({"hostname": "sw1", "name": "Ethernet1"})],
        )
        .await
        .unwrap();

        let other = store
            .find_by_field("interfaces", "hostname", "sw2")
            .await
            .unwrap();
        assert_eq!(other.len(), 1);
    }
}
