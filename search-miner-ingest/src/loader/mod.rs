//! Loader module for the search miner ingest.
//!
//! Reads documents from files or the sample generator and indexes them.

use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::errors::IngestError;
use crate::generators::generate_products;
use search_miner_repository::{product_index_settings, BulkIndexSummary, Connector};
use search_miner_shared::{Document, ID_FIELD};

/// Identifier used when a JSON file holds a single object.
const SINGLE_DOCUMENT_ID: &str = "1";

/// What the engine did with a load.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// Per-item results of a bulk request.
    Bulk(BulkIndexSummary),
    /// Acknowledgement for a single indexed document.
    Single(Value),
}

/// Result of one load operation.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    /// Number of documents submitted.
    pub documents: usize,
    pub outcome: LoadOutcome,
}

impl LoadReport {
    fn bulk(summary: BulkIndexSummary) -> Self {
        Self {
            documents: summary.total,
            outcome: LoadOutcome::Bulk(summary),
        }
    }

    fn single(acknowledgement: Value) -> Self {
        Self {
            documents: 1,
            outcome: LoadOutcome::Single(acknowledgement),
        }
    }

    /// Number of documents the engine rejected.
    pub fn failed(&self) -> usize {
        match &self.outcome {
            LoadOutcome::Bulk(summary) => summary.failed,
            LoadOutcome::Single(_) => 0,
        }
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }
}

/// Loads documents into one index.
pub struct DataLoader {
    connector: Arc<Connector>,
    index_name: String,
}

impl DataLoader {
    /// Create a new loader writing to `index_name`.
    pub fn new(connector: Arc<Connector>, index_name: impl Into<String>) -> Self {
        Self {
            connector,
            index_name: index_name.into(),
        }
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    /// Load a JSON file.
    ///
    /// A top-level array is bulk-indexed; every element must be an object.
    /// A top-level object is indexed as a single document with id `"1"`.
    #[instrument(skip(self, path), fields(index = %self.index_name, path = %path.as_ref().display()))]
    pub async fn load_from_json(&self, path: impl AsRef<Path>) -> Result<LoadReport, IngestError> {
        let path = path.as_ref();
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| IngestError::io(path, e))?;
        let value: Value = serde_json::from_str(&contents)?;

        match value {
            Value::Array(items) => {
                let documents = items
                    .into_iter()
                    .enumerate()
                    .map(|(position, item)| match item {
                        Value::Object(document) => Ok(document),
                        other => Err(IngestError::parse(format!(
                            "Element {} of {} is not an object: {}",
                            position,
                            path.display(),
                            other
                        ))),
                    })
                    .collect::<Result<Vec<Document>, _>>()?;

                let summary = self.connector.bulk_index(&self.index_name, &documents).await?;
                info!(count = documents.len(), "Loaded documents from JSON");
                Ok(LoadReport::bulk(summary))
            }
            Value::Object(document) => {
                let acknowledgement = self
                    .connector
                    .index_document(&self.index_name, SINGLE_DOCUMENT_ID, &document)
                    .await?;
                info!("Loaded single document from JSON");
                Ok(LoadReport::single(acknowledgement))
            }
            other => Err(IngestError::parse(format!(
                "Expected an array or object in {}, found {}",
                path.display(),
                json_kind(&other)
            ))),
        }
    }

    /// Load a CSV file with a header row.
    ///
    /// Every value is kept as a string. Empty cells and cells missing from
    /// short rows are dropped. Each row is indexed under its `id_field` value
    /// when it has one, otherwise under its zero-based row number.
    #[instrument(skip(self, path), fields(index = %self.index_name, path = %path.as_ref().display()))]
    pub async fn load_from_csv(
        &self,
        path: impl AsRef<Path>,
        id_field: Option<&str>,
    ) -> Result<LoadReport, IngestError> {
        let path = path.as_ref();
        let contents = tokio::fs::read(path)
            .await
            .map_err(|e| IngestError::io(path, e))?;
        let documents = parse_csv(&contents, id_field)?;

        let summary = self.connector.bulk_index(&self.index_name, &documents).await?;
        info!(count = documents.len(), "Loaded documents from CSV");
        Ok(LoadReport::bulk(summary))
    }

    /// Create the product index and fill it with `count` generated products.
    #[instrument(skip(self), fields(index = %self.index_name))]
    pub async fn generate_sample_products(&self, count: usize) -> Result<LoadReport, IngestError> {
        let created = self
            .connector
            .create_index(&self.index_name, Some(&product_index_settings()))
            .await?;
        if !created {
            warn!("Index already exists; its mapping may differ from the product mapping");
        }

        let documents: Vec<Document> = generate_products(count)
            .into_iter()
            .map(|product| product.into_document())
            .collect();
        debug!(count = documents.len(), "Generated sample products");

        let summary = self.connector.bulk_index(&self.index_name, &documents).await?;
        info!(count = count, "Generated and loaded sample products");
        Ok(LoadReport::bulk(summary))
    }
}

fn parse_csv(contents: &[u8], id_field: Option<&str>) -> Result<Vec<Document>, IngestError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(contents);
    let headers = reader.headers()?.clone();

    let mut documents = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let mut document: Document = headers
            .iter()
            .zip(record.iter())
            .filter(|(_, value)| !value.is_empty())
            .map(|(field, value)| (field.to_string(), Value::String(value.to_string())))
            .collect();

        let id = id_field
            .and_then(|field| document.get(field))
            .cloned()
            .unwrap_or_else(|| Value::String(row.to_string()));
        document.insert(ID_FIELD.to_string(), id);

        documents.push(document);
    }

    Ok(documents)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use search_miner_repository::memory::InMemoryProvider;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn loader(provider: &InMemoryProvider, index: &str) -> DataLoader {
        let connector = Arc::new(Connector::new(Box::new(provider.clone())));
        DataLoader::new(connector, index)
    }

    fn temp_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_csv_drops_empty_fields_and_uses_id_field() {
        let provider = InMemoryProvider::new();
        let loader = loader(&provider, "people");
        let file = temp_file("sku,name,note\nA1,Widget,\n,Gadget,fragile\n");

        let report = loader.load_from_csv(file.path(), Some("sku")).await.unwrap();
        assert_eq!(report.documents, 2);
        assert!(!report.has_failures());

        let stored = provider.documents("people");
        assert_eq!(stored[0].0, "A1");
        assert_eq!(stored[0].1, json!({"sku": "A1", "name": "Widget"}).as_object().cloned().unwrap());

        // No sku on the second row, so it falls back to its row number.
        assert_eq!(stored[1].0, "1");
        assert_eq!(stored[1].1.get("note"), Some(&json!("fragile")));
        assert!(!stored[1].1.contains_key("sku"));
    }

    #[tokio::test]
    async fn test_csv_without_id_field_uses_row_numbers() {
        let provider = InMemoryProvider::new();
        let loader = loader(&provider, "rows");
        let file = temp_file("a,b\n1,2\n3,4\n5,6\n");

        loader.load_from_csv(file.path(), None).await.unwrap();
        let ids: Vec<String> = provider.documents("rows").into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["0", "1", "2"]);
    }

    #[tokio::test]
    async fn test_csv_short_rows_drop_missing_cells() {
        let provider = InMemoryProvider::new();
        let loader = loader(&provider, "rows");
        let file = temp_file("a,b,c\n1,2,3\n4,5\n");

        let report = loader.load_from_csv(file.path(), None).await.unwrap();
        assert_eq!(report.documents, 2);

        let stored = provider.documents("rows");
        assert_eq!(stored[0].0, "0");
        assert_eq!(stored[0].1, json!({"a": "1", "b": "2", "c": "3"}).as_object().cloned().unwrap());
        assert_eq!(stored[1].0, "1");
        assert_eq!(stored[1].1, json!({"a": "4", "b": "5"}).as_object().cloned().unwrap());
    }

    #[tokio::test]
    async fn test_json_array_is_bulk_loaded() {
        let provider = InMemoryProvider::new();
        let loader = loader(&provider, "items");
        let file = temp_file(r#"[{"_id": "x", "v": 1}, {"v": 2}]"#);

        let report = loader.load_from_json(file.path()).await.unwrap();
        assert_eq!(report.documents, 2);

        let ids: Vec<String> = provider.documents("items").into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["x", "1"]);
    }

    #[tokio::test]
    async fn test_json_object_is_indexed_as_one() {
        let provider = InMemoryProvider::new();
        let loader = loader(&provider, "items");
        let file = temp_file(r#"{"title": "only"}"#);

        let report = loader.load_from_json(file.path()).await.unwrap();
        assert!(matches!(report.outcome, LoadOutcome::Single(_)));
        assert_eq!(provider.documents("items")[0].0, "1");
    }

    #[tokio::test]
    async fn test_json_rejects_scalars_and_non_object_elements() {
        let provider = InMemoryProvider::new();
        let loader = loader(&provider, "items");

        let scalar = temp_file("42");
        let err = loader.load_from_json(scalar.path()).await.unwrap_err();
        assert!(matches!(err, IngestError::ParseError(_)));

        let mixed = temp_file(r#"[{"a": 1}, "oops"]"#);
        let err = loader.load_from_json(mixed.path()).await.unwrap_err();
        assert!(matches!(err, IngestError::ParseError(_)));
        assert!(!provider.has_index("items"));
    }

    #[tokio::test]
    async fn test_missing_and_malformed_files() {
        let provider = InMemoryProvider::new();
        let loader = loader(&provider, "items");

        let err = loader.load_from_json("/definitely/not/here.json").await.unwrap_err();
        assert!(matches!(err, IngestError::Io { .. }));

        let broken = temp_file("[{\"a\": ");
        let err = loader.load_from_json(broken.path()).await.unwrap_err();
        assert!(matches!(err, IngestError::ParseError(_)));
    }

    #[tokio::test]
    async fn test_generate_sample_products() {
        let provider = InMemoryProvider::new();
        let connector = Arc::new(Connector::new(Box::new(provider.clone())));
        let loader = DataLoader::new(Arc::clone(&connector), "products");

        let report = loader.generate_sample_products(25).await.unwrap();
        assert_eq!(report.documents, 25);
        assert_eq!(report.failed(), 0);
        assert_eq!(connector.count("products", None).await.unwrap(), 25);

        assert_eq!(provider.mapping("products"), Some(product_index_settings()));
        let stored = provider.documents("products");
        assert_eq!(stored.len(), 25);
        assert_eq!(stored[0].0, "0");
        assert_eq!(stored[24].1.get("product_id"), Some(&json!("PROD-1024")));
    }

    #[tokio::test]
    async fn test_rejected_items_show_in_report() {
        let provider = InMemoryProvider::new().with_failing_ids(["1"]);
        let loader = loader(&provider, "rows");
        let file = temp_file("a\nx\ny\n");

        let report = loader.load_from_csv(file.path(), None).await.unwrap();
        assert!(report.has_failures());
        assert_eq!(report.failed(), 1);
    }
}
