//! Search index provider trait definition.
//!
//! This module defines the raw engine primitives the [`Connector`] is built
//! on. Providers do no policy work: existence checks, identifier assignment,
//! and logging all live in the connector.
//!
//! [`Connector`]: crate::Connector

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::SearchError;
use search_miner_shared::Document;

/// Abstracts the underlying search engine (OpenSearch, Elasticsearch, in-memory).
///
/// All implementations must be `Send + Sync` so a connector can be shared
/// behind an `Arc`. Every method maps one engine REST call.
#[async_trait]
pub trait SearchIndexProvider: Send + Sync {
    /// Check whether the engine answers at all.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - The node responded with a success status
    /// * `Ok(false)` - The node responded with an error status
    /// * `Err(SearchError::ConnectionError)` - The node could not be reached
    async fn ping(&self) -> Result<bool, SearchError>;

    /// Check whether an index exists.
    async fn index_exists(&self, index: &str) -> Result<bool, SearchError>;

    /// Create an index, optionally with a settings/mappings body.
    ///
    /// Creating an index that already exists is an error at this level.
    async fn create_index(&self, index: &str, body: Option<&Value>) -> Result<(), SearchError>;

    /// Delete an index. Deleting a missing index is `SearchError::NotFound`.
    async fn delete_index(&self, index: &str) -> Result<(), SearchError>;

    /// Fetch the mapping of an index.
    async fn get_mapping(&self, index: &str) -> Result<Value, SearchError>;

    /// Index (create or overwrite) one document under `id`.
    ///
    /// # Returns
    ///
    /// * `Ok(Value)` - The engine's acknowledgement body
    /// * `Err(SearchError)` - If indexing fails
    async fn index_document(
        &self,
        index: &str,
        id: &str,
        document: &Document,
    ) -> Result<Value, SearchError>;

    /// Submit a bulk request.
    ///
    /// `operations` holds action/source line pairs in the bulk NDJSON order.
    /// The returned body carries one entry per action under `items`; per-item
    /// failures do not make this call fail.
    async fn bulk(&self, index: &str, operations: Vec<Value>) -> Result<Value, SearchError>;

    /// Execute a search body.
    ///
    /// When `scroll` is set the engine opens a scroll context kept alive for
    /// that duration and the response carries a `_scroll_id`.
    async fn search(
        &self,
        index: &str,
        body: &Value,
        scroll: Option<&str>,
    ) -> Result<Value, SearchError>;

    /// Fetch the next page of an open scroll context.
    async fn scroll(&self, scroll_id: &str, keep_alive: &str) -> Result<Value, SearchError>;

    /// Release a scroll context.
    async fn clear_scroll(&self, scroll_id: &str) -> Result<(), SearchError>;

    /// Count documents, optionally restricted by a `{"query": ..}` body.
    async fn count(&self, index: &str, body: Option<&Value>) -> Result<Value, SearchError>;
}
