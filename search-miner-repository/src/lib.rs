//! # Search Miner Repository
//!
//! This crate owns every conversation with the search engine. It includes
//! the error type, the provider interface, the [`Connector`] that the loader
//! and miner talk to, and a concrete provider for OpenSearch/Elasticsearch.

pub mod client;
pub mod config;
pub mod errors;
pub mod interfaces;
pub mod opensearch;
pub mod queries;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod memory;

pub use client::Connector;
pub use config::ConnectionConfig;
pub use errors::SearchError;
pub use interfaces::SearchIndexProvider;
pub use crate::opensearch::{product_index_settings, OpenSearchProvider};
pub use types::{BulkIndexSummary, BulkItemFailure};
