//! HTTP client for an Elasticsearch-compatible document store.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::time::Duration;

use super::{DocumentStore, Hit};

/// Per-request timeout; store calls are short and a wedged store should
/// fail the job rather than hang a worker.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Index settings applied at creation time: a whitespace tokenizer with a
/// word-delimiter filter so queries match inside interface names like
/// `GigabitEthernet1/0/1` and hostnames with dots.
const INDEX_SETTINGS: &str = r#"{
    "index": {
        "analysis": {
            "filter": {
                "inventory_word_delimiter": {
                    "type": "word_delimiter",
                    "preserve_original": "true"
                }
            },
            "analyzer": {
                "inventory_analyzer": {
                    "type": "custom",
                    "tokenizer": "whitespace",
                    "filter": ["lowercase", "stop", "inventory_word_delimiter"]
                }
            }
        }
    }
}"#;

/// Document store client over HTTP.
#[derive(Debug, Clone)]
pub struct HttpDocStore {
    base_url: String,
    client: reqwest::Client,
}

impl HttpDocStore {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn run_search(&self, index: &str, body: Value) -> Result<Vec<Hit>> {
        let url = format!("{}/{}/_search", self.base_url, index);

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Failed to query index {}", index))?;

        // A query against an index that does not exist yet is an empty
        // result, not a failure: the cleanup job must be re-runnable even
        // before any category row was ever written.
        if resp.status().as_u16() == 404 {
            return Ok(Vec::new());
        }

        if !resp.status().is_success() {
            return Err(anyhow::anyhow!(
                "Store returned error for query on {}: {}",
                index,
                resp.status()
            ));
        }

        let payload: Value = resp
            .json()
            .await
            .with_context(|| format!("Failed to parse query response from {}", index))?;

        let hits = payload["hits"]["hits"]
            .as_array()
            .cloned()
            .unwrap_or_default();

        Ok(hits
            .into_iter()
            .filter_map(|hit| {
                let id = hit.get("_id")?.as_str()?.to_string();
                let source = hit.get("_source")?.clone();
                Some(Hit { id, source })
            })
            .collect())
    }
}

#[async_trait]
impl DocumentStore for HttpDocStore {
    async fn insert(&self, index: &str, doc: &Value) -> Result<String> {
        let url = format!("{}/{}/_doc", self.base_url, index);

        let resp = self
            .client
            .post(&url)
            .json(doc)
            .send()
            .await
            .with_context(|| format!("Failed to insert document into {}", index))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!(
                "Store rejected insert into {}: {} - {}",
                index,
                status,
                body
            ));
        }

        let payload: Value = resp
            .json()
            .await
            .with_context(|| format!("Failed to parse insert response from {}", index))?;

        payload
            .get("_id")
            .and_then(Value::as_str)
            .map(|s| s.to_string())
            .context("Insert response carried no document id")
    }

    async fn find_by_field(&self, index: &str, field: &str, value: &str) -> Result<Vec<Hit>> {
        let body = json!({
            "_source": true,
            "size": 10000,
            "query": {
                "simple_query_string": {
                    "query": format!("\"{}\"", value),
                    "fields": [field],
                    "analyze_wildcard": true,
                    "default_operator": "AND"
                }
            }
        });

        self.run_search(index, body).await
    }

    async fn search(&self, index: &str, query: &str) -> Result<Vec<Hit>> {
        let body = json!({
            "_source": true,
            "size": 10000,
            "query": {
                "simple_query_string": {
                    "query": query,
                    "analyze_wildcard": true,
                    "default_operator": "AND"
                }
            }
        });

        self.run_search(index, body).await
    }

    async fn update(&self, index: &str, id: &str, updates: &Value) -> Result<()> {
        let url = format!("{}/{}/_update/{}", self.base_url, index, id);

        let resp = self
            .client
            .post(&url)
            .json(&json!({ "doc": updates }))
            .send()
            .await
            .with_context(|| format!("Failed to update document {} in {}", id, index))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!(
                "Store rejected update of {} in {}: {} - {}",
                id,
                index,
                status,
                body
            ));
        }

        Ok(())
    }

    async fn delete(&self, index: &str, id: &str) -> Result<()> {
        let url = format!("{}/{}/_doc/{}", self.base_url, index, id);

        let resp = self
            .client
            .delete(&url)
            .send()
            .await
            .with_context(|| format!("Failed to delete document {} from {}", id, index))?;

        // Already gone is fine — rediscovery jobs for the same device may
        // interleave with a remove cascade.
        if resp.status().as_u16() == 404 {
            return Ok(());
        }

        if !resp.status().is_success() {
            return Err(anyhow::anyhow!(
                "Store rejected delete of {} from {}: {}",
                id,
                index,
                resp.status()
            ));
        }

        Ok(())
    }

    async fn create_index(&self, index: &str) -> Result<()> {
        let url = format!("{}/{}", self.base_url, index);

        let resp = self
            .client
            .put(&url)
            .send()
            .await
            .with_context(|| format!("Failed to create index {}", index))?;

        if resp.status().as_u16() == 400 {
            // Index already exists; init is re-runnable.
            tracing::debug!("Index {} already exists", index);
            return Ok(());
        }

        if !resp.status().is_success() {
            return Err(anyhow::anyhow!(
                "Store rejected index creation for {}: {}",
                index,
                resp.status()
            ));
        }

        // Settings can only change on a closed index.
        let settings: Value = serde_json::from_str(INDEX_SETTINGS).expect("valid settings json");

        self.client
            .post(format!("{}/{}/_close", self.base_url, index))
            .send()
            .await
            .with_context(|| format!("Failed to close index {}", index))?;

        let resp = self
            .client
            .put(format!("{}/{}/_settings", self.base_url, index))
            .json(&settings)
            .send()
            .await
            .with_context(|| format!("Failed to apply settings to index {}", index))?;

        if !resp.status().is_success() {
            tracing::warn!(
                "Settings for index {} were not applied: {}",
                index,
                resp.status()
            );
        }

        self.client
            .post(format!("{}/{}/_open", self.base_url, index))
            .send()
            .await
            .with_context(|| format!("Failed to reopen index {}", index))?;

        tracing::info!("Created index {}", index);
        Ok(())
    }

    async fn delete_index(&self, index: &str) -> Result<()> {
        let url = format!("{}/{}", self.base_url, index);

        let resp = self
            .client
            .delete(&url)
            .send()
            .await
            .with_context(|| format!("Failed to delete index {}", index))?;

        if resp.status().as_u16() == 404 {
            return Ok(());
        }

        if !resp.status().is_success() {
            return Err(anyhow::anyhow!(
                "Store rejected index deletion for {}: {}",
                index,
                resp.status()
            ));
        }

        tracing::info!("Deleted index {}", index);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_stripped() {
        let store = HttpDocStore::new("http://localhost:9200/").unwrap();
        assert_eq!(store.base_url(), "http://localhost:9200");
    }

    #[test]
    fn index_settings_parse() {
        let settings: Value = serde_json::from_str(INDEX_SETTINGS).unwrap();
        assert!(settings["index"]["analysis"]["analyzer"]["inventory_analyzer"].is_object());
    }
}
