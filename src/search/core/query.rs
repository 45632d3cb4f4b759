//! Search query and caller options.

use serde::{Deserialize, Serialize};

use crate::search::core::errors::{SearchError, SearchResult};
use crate::search::core::filters::FilterSet;

/// Caller-facing search options.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchOptions {
    /// Maximum number of results requested by the caller.
    pub limit: usize,
    /// Whether the semantic (embedding) retrieval branch runs.
    pub use_semantic: bool,
    /// Whether the attribute-filter retrieval branch runs.
    pub use_filters: bool,
    /// Whether the relevance judge runs after fusion.
    pub use_reranking: bool,
    /// Caller-supplied structured filters, merged with parsed filters.
    pub filters: FilterSet,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: 10,
            use_semantic: true,
            use_filters: true,
            use_reranking: true,
            filters: FilterSet::new(),
        }
    }
}

/// A validated search invocation: raw text plus options.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Raw query text as entered by the caller, trimmed.
    pub text: String,
    /// Caller options.
    pub options: SearchOptions,
}

impl SearchQuery {
    /// Validate and construct a search query.
    ///
    /// # Errors
    /// Returns `InvalidQuery` for empty/whitespace-only text, a zero limit,
    /// or when both retrieval branches are disabled.
    pub fn new(text: &str, options: SearchOptions) -> SearchResult<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(SearchError::InvalidQuery(
                "query text must not be empty".to_string(),
            ));
        }
        if options.limit == 0 {
            return Err(SearchError::InvalidQuery(
                "limit must be > 0".to_string(),
            ));
        }
        if !options.use_semantic && !options.use_filters {
            return Err(SearchError::InvalidQuery(
                "at least one of use_semantic and use_filters must be enabled".to_string(),
            ));
        }

        Ok(Self {
            text: trimmed.to_string(),
            options,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_empty_query() {
        let err = SearchQuery::new("   \t\n", SearchOptions::default()).expect_err("empty");
        assert!(matches!(err, SearchError::InvalidQuery(_)));
    }

    #[test]
    fn test_rejects_zero_limit() {
        let options = SearchOptions {
            limit: 0,
            ..SearchOptions::default()
        };
        assert!(SearchQuery::new("pasta", options).is_err());
    }

    #[test]
    fn test_rejects_both_branches_disabled() {
        let options = SearchOptions {
            use_semantic: false,
            use_filters: false,
            ..SearchOptions::default()
        };
        assert!(SearchQuery::new("pasta", options).is_err());
    }

    #[test]
    fn test_trims_query_text() {
        let query = SearchQuery::new("  quick curry ", SearchOptions::default()).expect("valid");
        assert_eq!(query.text, "quick curry");
    }
}
