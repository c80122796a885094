//! Connector implementation.
//!
//! This module provides the single point of contact with the search engine.
//! The loader and miner use it to create and delete indexes, index documents,
//! and run searches.

use serde_json::{json, Value};
use tracing::{debug, error, info, instrument, warn};

use crate::config::ConnectionConfig;
use crate::errors::SearchError;
use crate::interfaces::SearchIndexProvider;
use crate::opensearch::OpenSearchProvider;
use crate::queries::SCROLL_KEEP_ALIVE;
use crate::types::BulkIndexSummary;
use search_miner_shared::{hits_from_response, scroll_id, split_id, Document, SearchHit};

/// Number of rejected bulk items logged individually before summarizing.
const MAX_LOGGED_FAILURES: usize = 10;

/// The main client for talking to the search engine.
///
/// Every operation logs failures and hands the error back to the caller;
/// nothing is retried.
pub struct Connector {
    provider: Box<dyn SearchIndexProvider>,
}

impl Connector {
    /// Create a connector over an existing provider.
    pub fn new(provider: Box<dyn SearchIndexProvider>) -> Self {
        Self { provider }
    }

    /// Connect to the engine described by `config` and verify it answers.
    ///
    /// # Returns
    ///
    /// * `Ok(Connector)` - The engine answered the ping
    /// * `Err(SearchError::ConnectionError)` - The engine is unreachable or the ping failed
    pub async fn connect(config: &ConnectionConfig) -> Result<Self, SearchError> {
        let provider = OpenSearchProvider::new(config).inspect_err(|e| {
            error!(error = %e, "Error connecting to search engine");
        })?;

        let connector = Self::new(Box::new(provider));
        if !connector.ping().await? {
            error!(url = %config.url(), "Could not connect to search engine");
            return Err(SearchError::connection(format!(
                "Failed to connect to search engine at {}",
                config.url()
            )));
        }

        info!(url = %config.url(), "Successfully connected to search engine");
        Ok(connector)
    }

    /// Check whether the engine answers.
    pub async fn ping(&self) -> Result<bool, SearchError> {
        self.provider.ping().await.inspect_err(|e| {
            error!(error = %e, "Error connecting to search engine");
        })
    }

    /// Create an index unless it already exists.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - The index was created (with `mapping` as its body when given)
    /// * `Ok(false)` - The index already existed and was left untouched
    /// * `Err(SearchError)` - If the existence check or creation fails
    #[instrument(skip(self, mapping))]
    pub async fn create_index(&self, name: &str, mapping: Option<&Value>) -> Result<bool, SearchError> {
        let log_error = |e: &SearchError| error!(index = %name, error = %e, "Error creating index");

        if self.provider.index_exists(name).await.inspect_err(log_error)? {
            info!(index = %name, "Index already exists");
            return Ok(false);
        }

        self.provider
            .create_index(name, mapping)
            .await
            .inspect_err(log_error)?;
        info!(index = %name, "Index created successfully");
        Ok(true)
    }

    /// Delete an index if it exists.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - The index was deleted
    /// * `Ok(false)` - There was no such index
    /// * `Err(SearchError)` - If the existence check or deletion fails
    #[instrument(skip(self))]
    pub async fn delete_index(&self, name: &str) -> Result<bool, SearchError> {
        let log_error = |e: &SearchError| error!(index = %name, error = %e, "Error deleting index");

        if !self.provider.index_exists(name).await.inspect_err(log_error)? {
            info!(index = %name, "Index does not exist");
            return Ok(false);
        }

        self.provider.delete_index(name).await.inspect_err(log_error)?;
        info!(index = %name, "Index deleted successfully");
        Ok(true)
    }

    /// Index one document under `id`, overwriting any document already there.
    ///
    /// Returns the engine's acknowledgement body.
    #[instrument(skip(self, document))]
    pub async fn index_document(
        &self,
        index: &str,
        id: &str,
        document: &Document,
    ) -> Result<Value, SearchError> {
        let response = self
            .provider
            .index_document(index, id, document)
            .await
            .inspect_err(|e| error!(index = %index, error = %e, "Error indexing document"))?;

        info!(index = %index, id = %id, "Document indexed");
        Ok(response)
    }

    /// Index a batch of documents in a single bulk request.
    ///
    /// Each document is indexed under its `_id` field when present, otherwise
    /// under its zero-based position in `documents`. The `_id` field is not
    /// sent as part of the source.
    ///
    /// # Returns
    ///
    /// * `Ok(BulkIndexSummary)` - Per-item outcome; rejected items are listed, not raised
    /// * `Err(SearchError)` - If the bulk request as a whole fails
    #[instrument(skip(self, documents), fields(count = documents.len()))]
    pub async fn bulk_index(
        &self,
        index: &str,
        documents: &[Document],
    ) -> Result<BulkIndexSummary, SearchError> {
        if documents.is_empty() {
            debug!(index = %index, "Empty batch, nothing to index");
            return Ok(BulkIndexSummary::empty());
        }

        let mut operations = Vec::with_capacity(documents.len() * 2);
        for (position, document) in documents.iter().enumerate() {
            let (id, source) = split_id(document.clone(), position);
            operations.push(json!({ "index": { "_index": index, "_id": id } }));
            operations.push(Value::Object(source));
        }

        let summary = self
            .provider
            .bulk(index, operations)
            .await
            .and_then(|response| BulkIndexSummary::from_response(&response))
            .inspect_err(|e| error!(index = %index, error = %e, "Error during bulk indexing"))?;

        if summary.has_failures() {
            for failure in summary.failures.iter().take(MAX_LOGGED_FAILURES) {
                warn!(
                    id = %failure.id,
                    status = failure.status,
                    reason = %failure.reason,
                    "Bulk item rejected"
                );
            }
            warn!(
                index = %index,
                total = summary.total,
                failed = summary.failed,
                "Bulk indexing finished with rejected items"
            );
        } else {
            info!(index = %index, count = summary.succeeded, "Bulk indexed documents");
        }

        Ok(summary)
    }

    /// Execute a raw search body and return the full response envelope.
    #[instrument(skip(self, body))]
    pub async fn search(&self, index: &str, body: &Value) -> Result<Value, SearchError> {
        let response = self
            .provider
            .search(index, body, None)
            .await
            .inspect_err(|e| error!(index = %index, error = %e, "Error during search"))?;

        let hit_count = response
            .get("hits")
            .and_then(|h| h.get("hits"))
            .and_then(Value::as_array)
            .map(Vec::len)
            .unwrap_or(0);
        info!(index = %index, hits = hit_count, "Search executed successfully");

        Ok(response)
    }

    /// Retrieve every document matching `body` through a scroll context.
    ///
    /// Pages are followed until the engine returns an empty page. The scroll
    /// context is cleared afterwards; a failure to clear is only logged.
    #[instrument(skip(self, body))]
    pub async fn scan(&self, index: &str, body: &Value) -> Result<Vec<SearchHit>, SearchError> {
        let mut cursor: Option<String> = None;
        let result = self.scroll_pages(index, body, &mut cursor).await;

        if let Some(id) = cursor.as_deref() {
            if let Err(e) = self.provider.clear_scroll(id).await {
                warn!(error = %e, "Failed to clear scroll context");
            }
        }

        let documents = result
            .inspect_err(|e| error!(index = %index, error = %e, "Error scanning documents"))?;

        info!(index = %index, count = documents.len(), "Scanned documents");
        Ok(documents)
    }

    /// Follow a scroll until an empty page, recording the latest cursor in
    /// `cursor` so the caller can release it even on failure.
    async fn scroll_pages(
        &self,
        index: &str,
        body: &Value,
        cursor: &mut Option<String>,
    ) -> Result<Vec<SearchHit>, SearchError> {
        let mut documents = Vec::new();
        let mut response = self
            .provider
            .search(index, body, Some(SCROLL_KEEP_ALIVE))
            .await?;

        loop {
            let hits = hits_from_response(&response)?;
            if let Some(id) = scroll_id(&response) {
                *cursor = Some(id.to_string());
            }
            if hits.is_empty() {
                break;
            }
            documents.extend(hits);

            let Some(id) = cursor.as_deref() else {
                break;
            };
            response = self.provider.scroll(id, SCROLL_KEEP_ALIVE).await?;
        }

        Ok(documents)
    }

    /// Count the documents in an index, optionally restricted by a query body.
    #[instrument(skip(self, body))]
    pub async fn count(&self, index: &str, body: Option<&Value>) -> Result<u64, SearchError> {
        self.provider
            .count(index, body)
            .await
            .and_then(|response| {
                response
                    .get("count")
                    .and_then(Value::as_u64)
                    .ok_or_else(|| SearchError::parse("Count response is missing 'count'"))
            })
            .inspect_err(|e| error!(index = %index, error = %e, "Error getting document count"))
    }

    /// Fetch the mapping of an index.
    #[instrument(skip(self))]
    pub async fn get_mapping(&self, index: &str) -> Result<Value, SearchError> {
        self.provider
            .get_mapping(index)
            .await
            .inspect_err(|e| error!(index = %index, error = %e, "Error getting mapping"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryProvider;
    use crate::opensearch::product_index_settings;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    fn connector(provider: &InMemoryProvider) -> Connector {
        Connector::new(Box::new(provider.clone()))
    }

    #[tokio::test]
    async fn test_create_index_twice() {
        let provider = InMemoryProvider::new();
        let connector = connector(&provider);
        let mapping = product_index_settings();

        assert!(connector.create_index("products", Some(&mapping)).await.unwrap());
        assert!(!connector
            .create_index("products", Some(&json!({"mappings": {"properties": {}}})))
            .await
            .unwrap());

        // The second call must not replace the original mapping.
        assert_eq!(provider.mapping("products"), Some(mapping));
    }

    #[tokio::test]
    async fn test_delete_missing_index_returns_false() {
        let provider = InMemoryProvider::new();
        let connector = connector(&provider);

        assert!(!connector.delete_index("nope").await.unwrap());

        connector.create_index("present", None).await.unwrap();
        assert!(connector.delete_index("present").await.unwrap());
        assert!(!provider.has_index("present"));
    }

    #[tokio::test]
    async fn test_bulk_index_assigns_positional_ids() {
        let provider = InMemoryProvider::new();
        let connector = connector(&provider);

        let documents = vec![
            doc(json!({"a": 1})),
            doc(json!({"_id": "custom", "a": 2})),
            doc(json!({"a": 3})),
        ];

        let summary = connector.bulk_index("items", &documents).await.unwrap();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.succeeded, 3);

        let stored = provider.documents("items");
        let ids: Vec<&str> = stored.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["0", "custom", "2"]);
        assert!(stored.iter().all(|(_, source)| !source.contains_key("_id")));
    }

    #[tokio::test]
    async fn test_bulk_index_surfaces_rejected_items() {
        let provider = InMemoryProvider::new().with_failing_ids(["1"]);
        let connector = connector(&provider);

        let documents = vec![doc(json!({"a": 1})), doc(json!({"a": 2}))];
        let summary = connector.bulk_index("items", &documents).await.unwrap();

        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.failures[0].id, "1");
        assert_eq!(provider.documents("items").len(), 1);
    }

    #[tokio::test]
    async fn test_bulk_index_empty_batch_skips_engine() {
        let provider = InMemoryProvider::unreachable();
        let connector = connector(&provider);

        let summary = connector.bulk_index("items", &[]).await.unwrap();
        assert_eq!(summary, BulkIndexSummary::empty());
    }

    #[tokio::test]
    async fn test_index_document_overwrites() {
        let provider = InMemoryProvider::new();
        let connector = connector(&provider);

        connector
            .index_document("items", "1", &doc(json!({"v": "old"})))
            .await
            .unwrap();
        let ack = connector
            .index_document("items", "1", &doc(json!({"v": "new"})))
            .await
            .unwrap();

        assert_eq!(ack["result"], "updated");
        let stored = provider.documents("items");
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].1.get("v"), Some(&json!("new")));
    }

    #[tokio::test]
    async fn test_scan_pages_through_everything() {
        let provider = InMemoryProvider::new().with_page_size(2);
        let connector = connector(&provider);

        let documents: Vec<Document> = (0..5).map(|i| doc(json!({"n": i}))).collect();
        connector.bulk_index("items", &documents).await.unwrap();

        let hits = connector
            .scan("items", &json!({"query": {"match_all": {}}}))
            .await
            .unwrap();

        assert_eq!(hits.len(), 5);
        assert_eq!(provider.open_scrolls(), 0);
    }

    #[tokio::test]
    async fn test_count() {
        let provider = InMemoryProvider::new();
        let connector = connector(&provider);

        let documents: Vec<Document> = (0..4).map(|i| doc(json!({"n": i}))).collect();
        connector.bulk_index("items", &documents).await.unwrap();

        assert_eq!(connector.count("items", None).await.unwrap(), 4);
        let filtered = json!({"query": {"term": {"n": 2}}});
        assert_eq!(connector.count("items", Some(&filtered)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_errors_are_returned_not_swallowed() {
        let provider = InMemoryProvider::unreachable();
        let connector = connector(&provider);

        assert!(!connector.ping().await.unwrap());
        let err = connector.search("items", &json!({})).await.unwrap_err();
        assert!(matches!(err, SearchError::ConnectionError(_)));
    }
}
