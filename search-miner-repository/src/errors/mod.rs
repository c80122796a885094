//! Error types for the search miner repository.

mod search_error;

pub use search_error::SearchError;
