//! OpenSearch provider implementation.
//!
//! This module provides the concrete implementation of `SearchIndexProvider`
//! using the OpenSearch Rust client.

use async_trait::async_trait;
use opensearch::{
    auth::Credentials,
    cert::CertificateValidation,
    http::request::JsonBody,
    http::response::Response,
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    indices::{IndicesCreateParts, IndicesDeleteParts, IndicesExistsParts, IndicesGetMappingParts},
    BulkParts, ClearScrollParts, CountParts, IndexParts, OpenSearch, ScrollParts, SearchParts,
};
use serde_json::{json, Value};
use tracing::{debug, error, info};
use url::Url;

use crate::config::ConnectionConfig;
use crate::errors::SearchError;
use crate::interfaces::SearchIndexProvider;
use search_miner_shared::Document;

/// OpenSearch provider.
///
/// Talks to a single node over HTTP(S). Elasticsearch clusters that accept
/// the 7.x REST API work as well.
///
/// # Example
///
/// ```ignore
/// let config = ConnectionConfig::new("localhost", 9200).with_credentials("admin", "admin");
/// let provider = OpenSearchProvider::new(&config)?;
/// let alive = provider.ping().await?;
/// ```
pub struct OpenSearchProvider {
    client: OpenSearch,
}

impl OpenSearchProvider {
    /// Create a provider for the node described by `config`.
    ///
    /// No request is made here; call `ping` to verify the node is reachable.
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchProvider)` - A new provider instance
    /// * `Err(SearchError)` - If the URL is invalid or transport setup fails
    pub fn new(config: &ConnectionConfig) -> Result<Self, SearchError> {
        let url = config.url();
        let parsed_url = Url::parse(&url).map_err(|e| SearchError::connection(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let mut builder = TransportBuilder::new(conn_pool).disable_proxy();

        if let Some((username, password)) = config.credentials() {
            builder = builder.auth(Credentials::Basic(username.to_string(), password.to_string()));
        }

        if !config.verify_certs {
            builder = builder.cert_validation(CertificateValidation::None);
        }

        let transport = builder
            .build()
            .map_err(|e| SearchError::connection(e.to_string()))?;

        info!(
            url = %url,
            authenticated = config.credentials().is_some(),
            verify_certs = config.verify_certs,
            "Created OpenSearch client"
        );

        Ok(Self {
            client: OpenSearch::new(transport),
        })
    }

    /// Turn a non-success response into an error built by `make_error`,
    /// otherwise decode the JSON body.
    async fn read_json(
        response: Response,
        make_error: fn(String) -> SearchError,
    ) -> Result<Value, SearchError> {
        let response = Self::check_status(response, make_error).await?;
        response
            .json::<Value>()
            .await
            .map_err(|e| SearchError::parse(e.to_string()))
    }

    async fn check_status(
        response: Response,
        make_error: fn(String) -> SearchError,
    ) -> Result<Response, SearchError> {
        let status = response.status_code();
        if status.is_success() {
            return Ok(response);
        }

        let error_body = response.text().await.unwrap_or_default();
        error!(status = %status, body = %error_body, "Request failed");

        if status.as_u16() == 404 {
            return Err(SearchError::not_found(error_body));
        }
        Err(make_error(format!(
            "Request failed with status {}: {}",
            status, error_body
        )))
    }
}

#[async_trait]
impl SearchIndexProvider for OpenSearchProvider {
    async fn ping(&self) -> Result<bool, SearchError> {
        let response = self
            .client
            .ping()
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        Ok(response.status_code().is_success())
    }

    async fn index_exists(&self, index: &str) -> Result<bool, SearchError> {
        let response = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| SearchError::query(e.to_string()))?;

        match response.status_code().as_u16() {
            200 => Ok(true),
            404 => Ok(false),
            status => Err(SearchError::query(format!(
                "Index existence check returned status {}",
                status
            ))),
        }
    }

    async fn create_index(&self, index: &str, body: Option<&Value>) -> Result<(), SearchError> {
        let indices = self.client.indices();
        let request = indices.create(IndicesCreateParts::Index(index));
        let response = match body {
            Some(body) => request.body(body.clone()).send().await,
            None => request.send().await,
        }
        .map_err(|e| SearchError::index_creation(e.to_string()))?;

        Self::check_status(response, SearchError::IndexCreationError).await?;
        debug!(index = %index, "Index created");
        Ok(())
    }

    async fn delete_index(&self, index: &str) -> Result<(), SearchError> {
        let response = self
            .client
            .indices()
            .delete(IndicesDeleteParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| SearchError::delete(e.to_string()))?;

        Self::check_status(response, SearchError::DeleteError).await?;
        debug!(index = %index, "Index deleted");
        Ok(())
    }

    async fn get_mapping(&self, index: &str) -> Result<Value, SearchError> {
        let response = self
            .client
            .indices()
            .get_mapping(IndicesGetMappingParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| SearchError::query(e.to_string()))?;

        Self::read_json(response, SearchError::QueryError).await
    }

    async fn index_document(
        &self,
        index: &str,
        id: &str,
        document: &Document,
    ) -> Result<Value, SearchError> {
        let response = self
            .client
            .index(IndexParts::IndexId(index, id))
            .body(document)
            .send()
            .await
            .map_err(|e| SearchError::index(e.to_string()))?;

        Self::read_json(response, SearchError::IndexError).await
    }

    async fn bulk(&self, index: &str, operations: Vec<Value>) -> Result<Value, SearchError> {
        let body: Vec<JsonBody<Value>> = operations.into_iter().map(Into::into).collect();

        let response = self
            .client
            .bulk(BulkParts::Index(index))
            .body(body)
            .send()
            .await
            .map_err(|e| SearchError::bulk_index(e.to_string()))?;

        Self::read_json(response, SearchError::BulkIndexError).await
    }

    async fn search(
        &self,
        index: &str,
        body: &Value,
        scroll: Option<&str>,
    ) -> Result<Value, SearchError> {
        let indices = [index];
        let mut request = self
            .client
            .search(SearchParts::Index(&indices))
            .body(body.clone());
        if let Some(keep_alive) = scroll {
            request = request.scroll(keep_alive);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SearchError::query(e.to_string()))?;

        Self::read_json(response, SearchError::QueryError).await
    }

    async fn scroll(&self, scroll_id: &str, keep_alive: &str) -> Result<Value, SearchError> {
        let response = self
            .client
            .scroll(ScrollParts::None)
            .body(json!({
                "scroll": keep_alive,
                "scroll_id": scroll_id
            }))
            .send()
            .await
            .map_err(|e| SearchError::query(e.to_string()))?;

        Self::read_json(response, SearchError::QueryError).await
    }

    async fn clear_scroll(&self, scroll_id: &str) -> Result<(), SearchError> {
        let response = self
            .client
            .clear_scroll(ClearScrollParts::None)
            .body(json!({ "scroll_id": [scroll_id] }))
            .send()
            .await
            .map_err(|e| SearchError::query(e.to_string()))?;

        Self::check_status(response, SearchError::QueryError).await?;
        Ok(())
    }

    async fn count(&self, index: &str, body: Option<&Value>) -> Result<Value, SearchError> {
        let indices = [index];
        let request = self.client.count(CountParts::Index(&indices));
        let response = match body {
            Some(body) => request.body(body.clone()).send().await,
            None => request.send().await,
        }
        .map_err(|e| SearchError::query(e.to_string()))?;

        Self::read_json(response, SearchError::QueryError).await
    }
}
