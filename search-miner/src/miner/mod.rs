//! Reading, aggregating, and exporting documents from one index.

use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use tracing::{error, info, instrument};

use crate::export::{write_csv_file, write_json_file};
use crate::MinerError;
use search_miner_repository::queries::{
    aggregation_request, match_all, match_all_request, scan_request, with_source_fields, wrap_query,
};
use search_miner_repository::{Connector, SearchError};
use search_miner_shared::{hits_from_response, Document, SearchHit};

/// Miner bound to a single index.
pub struct Miner {
    connector: Arc<Connector>,
    index_name: String,
}

impl Miner {
    pub fn new(connector: Arc<Connector>, index_name: impl Into<String>) -> Self {
        Self {
            connector,
            index_name: index_name.into(),
        }
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    /// Fetch the mapping of the index.
    pub async fn get_index_mapping(&self) -> Result<Value, MinerError> {
        Ok(self.connector.get_mapping(&self.index_name).await?)
    }

    /// Up to `size` documents from a match-all search.
    pub async fn get_all_documents(&self, size: usize) -> Result<Vec<SearchHit>, MinerError> {
        self.search_hits(&match_all_request(size))
            .await
            .inspect_err(|e| error!(error = %e, "Error retrieving all documents"))
    }

    /// Every document in the index, retrieved through a scroll.
    pub async fn scan_all_documents(&self) -> Result<Vec<SearchHit>, MinerError> {
        let hits = self
            .connector
            .scan(&self.index_name, &scan_request(match_all()))
            .await?;
        info!(index = %self.index_name, count = hits.len(), "Scanned documents");
        Ok(hits)
    }

    /// Run a query and return its hits.
    ///
    /// `query` may be a full body or a bare clause; a body without a
    /// top-level `query` key is wrapped as `{"query": query}`.
    #[instrument(skip(self, query), fields(index = %self.index_name))]
    pub async fn query_documents(&self, query: Value) -> Result<Vec<SearchHit>, MinerError> {
        self.search_hits(&wrap_query(query))
            .await
            .inspect_err(|e| error!(error = %e, "Error querying documents"))
    }

    /// Total number of documents in the index.
    pub async fn get_document_count(&self) -> Result<u64, MinerError> {
        Ok(self.connector.count(&self.index_name, None).await?)
    }

    /// Export the sources of matching documents to CSV.
    ///
    /// `query` defaults to match-all. When `fields` is given, only those
    /// fields are fetched and they become the columns, in order.
    #[instrument(skip(self, path, query, fields), fields(index = %self.index_name, path = %path.display()))]
    pub async fn export_to_csv(
        &self,
        path: &Path,
        query: Option<Value>,
        fields: Option<&[String]>,
    ) -> Result<usize, MinerError> {
        let mut body = export_body(query);
        if let Some(fields) = fields {
            body = with_source_fields(body, fields);
        }

        let sources = self.export_sources(body).await?;
        let rows = write_csv_file(path, &sources, fields)
            .inspect_err(|e| error!(error = %e, "Error exporting to CSV"))?;

        info!(count = rows, "Exported documents to CSV");
        Ok(rows)
    }

    /// Export the sources of matching documents as a JSON array.
    #[instrument(skip(self, path, query), fields(index = %self.index_name, path = %path.display()))]
    pub async fn export_to_json(&self, path: &Path, query: Option<Value>) -> Result<usize, MinerError> {
        let sources = self.export_sources(export_body(query)).await?;
        let count = write_json_file(path, &sources)
            .inspect_err(|e| error!(error = %e, "Error exporting to JSON"))?;

        info!(count = count, "Exported documents to JSON");
        Ok(count)
    }

    /// Run aggregations without fetching hits and return the `aggregations`
    /// object.
    #[instrument(skip(self, aggs), fields(index = %self.index_name))]
    pub async fn aggregate_data(&self, aggs: Value) -> Result<Value, MinerError> {
        let mut response = self
            .connector
            .search(&self.index_name, &aggregation_request(aggs))
            .await
            .inspect_err(|e| error!(error = %e, "Error running aggregation"))?;

        response
            .get_mut("aggregations")
            .map(Value::take)
            .ok_or_else(|| MinerError::MissingField("aggregations".to_string()))
    }

    async fn search_hits(&self, body: &Value) -> Result<Vec<SearchHit>, MinerError> {
        let response = self.connector.search(&self.index_name, body).await?;
        Ok(hits_from_response(&response).map_err(SearchError::from)?)
    }

    async fn export_sources(&self, body: Value) -> Result<Vec<Document>, MinerError> {
        let hits = self.query_documents(body).await?;
        Ok(hits.into_iter().map(SearchHit::into_source).collect())
    }
}

/// Keys under which a request body carries its aggregations.
const AGGREGATION_KEYS: [&str; 2] = ["aggs", "aggregations"];

/// Aggregation definitions from a user-supplied body.
///
/// A body of `{"aggs": {..}}` or `{"aggregations": {..}}` is unwrapped, and
/// any other top-level key beside it is rejected. An object with neither key
/// is taken as the definitions themselves.
pub fn aggregations_from_body(body: Value) -> Result<Value, MinerError> {
    let Value::Object(mut object) = body else {
        return Err(MinerError::config("Aggregation body must be a JSON object"));
    };

    let present: Vec<&str> = AGGREGATION_KEYS
        .iter()
        .copied()
        .filter(|key| object.contains_key(*key))
        .collect();

    match present.as_slice() {
        [] => Ok(Value::Object(object)),
        [key] => {
            if let Some(other) = object.keys().find(|k| k.as_str() != *key) {
                return Err(MinerError::config(format!(
                    "Unsupported key '{}' beside '{}' in aggregation body",
                    other, key
                )));
            }
            Ok(object.remove(*key).unwrap_or_default())
        }
        _ => Err(MinerError::config(
            "Aggregation body has both 'aggs' and 'aggregations'",
        )),
    }
}

fn export_body(query: Option<Value>) -> Value {
    wrap_query(query.unwrap_or_else(match_all))
}
