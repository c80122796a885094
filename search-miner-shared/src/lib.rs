//! # Search Miner Shared
//!
//! Types shared by the connector, loader, and miner crates: the untyped
//! [`Document`] that flows into the engine and the [`SearchHit`] view of
//! what comes back out.

pub mod document;
pub mod hit;

pub use document::{document_id, split_id, Document, ID_FIELD};
pub use hit::{hits_from_response, scroll_id, total_hits, EnvelopeError, SearchHit};
