//! OpenSearch implementation of the search index provider.
//!
//! Elasticsearch 7.x speaks the same REST dialect for every call made here.

mod client;
mod index_config;

pub use client::OpenSearchProvider;
pub use index_config::{product_index_settings, PRODUCT_INDEX_FIELDS};
