//! Interface definitions for the search engine backend.
//!
//! The `SearchIndexProvider` trait is the seam between the [`Connector`]
//! and the engine, so tests can swap in an in-memory backend.
//!
//! [`Connector`]: crate::Connector

mod search_index_provider;

pub use search_index_provider::SearchIndexProvider;
