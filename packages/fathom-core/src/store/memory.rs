//! In-memory document store for tests and local development.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use super::{DocumentStore, Hit};

/// A [`DocumentStore`] holding everything in process memory. Matches the
/// HTTP store's observable behavior: ids are opaque strings, queries on
/// absent indices return empty, deleting a missing document is a no-op.
#[derive(Debug, Default)]
pub struct MemoryStore {
    indices: Mutex<HashMap<String, Vec<(String, Value)>>>,
    next_id: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently in an index.
    pub fn count(&self, index: &str) -> usize {
        self.indices
            .lock()
            .unwrap()
            .get(index)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

fn value_matches(doc: &Value, needle: &str) -> bool {
    match doc {
        Value::String(s) => s.contains(needle),
        Value::Number(n) => n.to_string() == needle,
        Value::Array(items) => items.iter().any(|v| value_matches(v, needle)),
        Value::Object(map) => map.values().any(|v| value_matches(v, needle)),
        _ => false,
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert(&self, index: &str, doc: &Value) -> Result<String> {
        let id = format!("mem-{}", self.next_id.fetch_add(1, Ordering::Relaxed));
        self.indices
            .lock()
            .unwrap()
            .entry(index.to_string())
            .or_default()
            .push((id.clone(), doc.clone()));
        Ok(id)
    }

    async fn find_by_field(&self, index: &str, field: &str, value: &str) -> Result<Vec<Hit>> {
        let indices = self.indices.lock().unwrap();
        let Some(docs) = indices.get(index) else {
            return Ok(Vec::new());
        };

        Ok(docs
            .iter()
            .filter(|(_, doc)| {
                doc.get(field)
                    .map(|v| match v {
                        Value::String(s) => s == value,
                        other => other.to_string() == value,
                    })
                    .unwrap_or(false)
            })
            .map(|(id, doc)| Hit {
                id: id.clone(),
                source: doc.clone(),
            })
            .collect())
    }

    async fn search(&self, index: &str, query: &str) -> Result<Vec<Hit>> {
        let indices = self.indices.lock().unwrap();
        let Some(docs) = indices.get(index) else {
            return Ok(Vec::new());
        };

        Ok(docs
            .iter()
            .filter(|(_, doc)| query == "*" || value_matches(doc, query))
            .map(|(id, doc)| Hit {
                id: id.clone(),
                source: doc.clone(),
            })
            .collect())
    }

    async fn update(&self, index: &str, id: &str, updates: &Value) -> Result<()> {
        let mut indices = self.indices.lock().unwrap();
        let docs = indices
            .get_mut(index)
            .ok_or_else(|| anyhow::anyhow!("No such index: {}", index))?;

        let (_, doc) = docs
            .iter_mut()
            .find(|(doc_id, _)| doc_id == id)
            .ok_or_else(|| anyhow::anyhow!("No document {} in {}", id, index))?;

        if let (Value::Object(target), Value::Object(source)) = (doc, updates) {
            for (k, v) in source {
                target.insert(k.clone(), v.clone());
            }
        }
        Ok(())
    }

    async fn delete(&self, index: &str, id: &str) -> Result<()> {
        let mut indices = self.indices.lock().unwrap();
        if let Some(docs) = indices.get_mut(index) {
            docs.retain(|(doc_id, _)| doc_id != id);
        }
        Ok(())
    }

    async fn create_index(&self, index: &str) -> Result<()> {
        self.indices
            .lock()
            .unwrap()
            .entry(index.to_string())
            .or_default();
        Ok(())
    }

    async fn delete_index(&self, index: &str) -> Result<()> {
        self.indices.lock().unwrap().remove(index);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn insert_find_update_delete() {
        let store = MemoryStore::new();

        let id = store
            .insert("endpoints", &json!({"hostname": "sw1", "device_type": "cisco_ios"}))
            .await
            .unwrap();

        let hits = store
            .find_by_field("endpoints", "hostname", "sw1")
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].field("device_type"), Some("cisco_ios"));

        store
            .update("endpoints", &id, &json!({"device_type": "arista_eos"}))
            .await
            .unwrap();
        let hits = store
            .find_by_field("endpoints", "device_type", "arista_eos")
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);

        store.delete("endpoints", &id).await.unwrap();
        assert_eq!(store.count("endpoints"), 0);

        // deleting again is a no-op, as with the HTTP store
        store.delete("endpoints", &id).await.unwrap();
    }

    #[tokio::test]
    async fn queries_on_missing_index_are_empty() {
        let store = MemoryStore::new();
        assert!(store.find_by_field("nope", "x", "y").await.unwrap().is_empty());
        assert!(store.search("nope", "y").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn free_text_search_matches_nested_values() {
        let store = MemoryStore::new();
        store
            .insert("interfaces", &json!({"hostname": "sw1", "addresses": ["10.1.2.3 255.255.255.0"]}))
            .await
            .unwrap();

        let hits = store.search("interfaces", "10.1.2.3").await.unwrap();
        assert_eq!(hits.len(), 1);
    }
}
