//! # Search Miner
//!
//! Library behind the `search-miner` command-line tool: settings, logging,
//! and the [`Miner`] that reads and exports documents from an index.

pub mod config;
pub mod export;
pub mod logging;
pub mod miner;

pub use config::Settings;
pub use miner::{aggregations_from_body, Miner};

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while configuring the tool or mining an index.
#[derive(Error, Debug)]
pub enum MinerError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Search error.
    #[error("Search error: {0}")]
    SearchError(#[from] search_miner_repository::SearchError),

    /// Ingest error.
    #[error("Ingest error: {0}")]
    IngestError(#[from] search_miner_ingest::IngestError),

    /// An export file could not be written.
    #[error("Failed to write {}: {source}", path.display())]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// CSV encoding error.
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// JSON encoding error.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// A response lacked a key the operation needs.
    #[error("Response is missing '{0}'")]
    MissingField(String),
}

impl MinerError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Create an I/O error for `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            source,
        }
    }
}
