//! Error types for the search miner ingest.

use std::path::PathBuf;

use search_miner_repository::SearchError;
use thiserror::Error;

/// Errors that can occur while loading data into an index.
#[derive(Error, Debug)]
pub enum IngestError {
    /// The input file could not be read.
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The input is not valid JSON, or not the shape a loader accepts.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// The CSV input could not be decoded.
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// Error from the search engine.
    #[error("Search error: {0}")]
    SearchError(#[from] SearchError),
}

impl IngestError {
    /// Create an I/O error for `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }
}

impl From<serde_json::Error> for IngestError {
    fn from(err: serde_json::Error) -> Self {
        Self::ParseError(err.to_string())
    }
}
