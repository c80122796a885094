//! Search response envelopes.
//!
//! The engine answers searches with `{"hits": {"total": .., "hits": [..]}}`.
//! This module pulls typed hits and scroll cursors out of that envelope
//! without interpreting anything else.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::document::Document;

/// Errors raised while reading a response envelope.
#[derive(Error, Debug)]
pub enum EnvelopeError {
    /// A required key was not present in the response.
    #[error("Response is missing '{0}'")]
    MissingField(&'static str),

    /// A hit could not be decoded.
    #[error("Malformed hit: {0}")]
    MalformedHit(#[from] serde_json::Error),
}

/// One entry of `hits.hits`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(rename = "_index", default)]
    pub index: String,
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(rename = "_score", default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(rename = "_source", default)]
    pub source: Document,
}

impl SearchHit {
    /// Consume the hit, keeping only its source payload.
    pub fn into_source(self) -> Document {
        self.source
    }
}

/// Extract `hits.hits` from a search or scroll response.
pub fn hits_from_response(response: &Value) -> Result<Vec<SearchHit>, EnvelopeError> {
    let hits = response
        .get("hits")
        .ok_or(EnvelopeError::MissingField("hits"))?
        .get("hits")
        .ok_or(EnvelopeError::MissingField("hits.hits"))?;

    Ok(Vec::<SearchHit>::deserialize(hits)?)
}

/// The scroll cursor of a response opened with `scroll=<keep-alive>`.
pub fn scroll_id(response: &Value) -> Option<&str> {
    response.get("_scroll_id").and_then(Value::as_str)
}

/// Total hit count, accepting both `total: N` and `total: {"value": N}`.
pub fn total_hits(response: &Value) -> Option<u64> {
    let total = response.get("hits")?.get("total")?;
    total
        .as_u64()
        .or_else(|| total.get("value").and_then(Value::as_u64))
}
