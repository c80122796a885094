//! # Search Miner Ingest
//!
//! This crate brings data into a search index. Documents come from a JSON
//! file, a CSV file, or the sample product generator, and are submitted
//! through the shared [`Connector`](search_miner_repository::Connector).

pub mod errors;
pub mod generators;
pub mod loader;

pub use errors::IngestError;
pub use generators::{generate_products, SampleProduct};
pub use loader::{DataLoader, LoadReport};
