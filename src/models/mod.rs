//! Core data models for RFC documents and search operations.

mod document;
mod search;

pub use document::{DocumentMetadata, InvalidIdentifier, RfcNumber};
pub use search::{SearchHit, SearchQuery, SearchResults, DEFAULT_SEARCH_LIMIT};
