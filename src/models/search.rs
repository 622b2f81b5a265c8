//! Search request and response models.

use serde::{Deserialize, Serialize};

/// Default number of hits returned when the caller does not bound the search.
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

/// Search query parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Substring to match against document names
    pub query: String,

    /// Maximum number of results to return
    pub limit: usize,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            query: String::new(),
            limit: DEFAULT_SEARCH_LIMIT,
        }
    }
}

impl SearchQuery {
    /// Create a new search query with the default result bound
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    /// Set the maximum number of results
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

/// One document matched by a search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    /// Document name, e.g. "rfc9000"
    pub name: String,

    /// Document title
    pub title: String,

    /// Document revision
    pub rev: String,

    /// Abstract-derived summary; `None` when the index has no abstract
    pub summary: Option<String>,
}

/// Search response containing the matched documents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResults {
    /// Query that was executed
    pub query: String,

    /// Matched documents, at most the requested limit
    pub hits: Vec<SearchHit>,

    /// Total matches the index reported, when it said (may exceed `hits.len()`)
    pub total_available: Option<u64>,
}

impl SearchResults {
    pub fn new(query: impl Into<String>, hits: Vec<SearchHit>) -> Self {
        Self {
            query: query.into(),
            hits,
            total_available: None,
        }
    }

    /// Set the index-reported total
    pub fn total_available(mut self, total: u64) -> Self {
        self.total_available = Some(total);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_query_defaults() {
        let query = SearchQuery::new("http semantics");
        assert_eq!(query.query, "http semantics");
        assert_eq!(query.limit, DEFAULT_SEARCH_LIMIT);
    }

    #[test]
    fn test_search_query_builder() {
        let query = SearchQuery::new("quic").limit(5);
        assert_eq!(query.limit, 5);
    }

    #[test]
    fn test_search_results_total() {
        let results = SearchResults::new("quic", vec![]).total_available(8);
        assert_eq!(results.total_available, Some(8));
        assert!(results.hits.is_empty());
    }
}
