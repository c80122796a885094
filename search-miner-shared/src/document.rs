//! Document representation and identifier resolution.

use serde_json::{Map, Value};

/// A schemaless document: field name to JSON value.
///
/// The only schema is whatever mapping the engine holds for the target index.
pub type Document = Map<String, Value>;

/// Field that carries an explicit document identifier.
pub const ID_FIELD: &str = "_id";

/// Resolve the identifier for a document at `position` within a batch.
///
/// A string `_id` is used unchanged, any other non-null `_id` is rendered as
/// JSON text, and a missing or null `_id` falls back to the position.
pub fn document_id(document: &Document, position: usize) -> String {
    match document.get(ID_FIELD) {
        Some(Value::String(id)) => id.clone(),
        Some(Value::Null) | None => position.to_string(),
        Some(other) => other.to_string(),
    }
}

/// Split a document into its identifier and the body sent to the engine.
///
/// The engine rejects `_id` inside a source, so it is removed from the body.
pub fn split_id(mut document: Document, position: usize) -> (String, Document) {
    let id = document_id(&document, position);
    document.remove(ID_FIELD);
    (id, document)
}
