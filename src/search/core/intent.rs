//! Parsed query intent produced by the query parser.

use serde::{Deserialize, Serialize};

use crate::search::core::filters::{DietType, FilterSet};

/// Structured understanding of a raw query.
///
/// Always produced: when LLM extraction fails, the intent degrades to the
/// raw query text with only the caller-supplied filters. The semantic query
/// is never empty.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedIntent {
    /// Cleaned query text used for embedding.
    pub semantic_query: String,
    /// Structured filters extracted from the query plus caller filters.
    pub filters: FilterSet,
    /// Whether LLM extraction failed and the intent fell back to raw text.
    pub degraded: bool,
}

impl ParsedIntent {
    /// Build a fully-parsed intent.
    #[must_use]
    pub fn new(semantic_query: String, filters: FilterSet) -> Self {
        Self {
            semantic_query,
            filters,
            degraded: false,
        }
    }

    /// Build the degraded fallback intent from raw query text.
    #[must_use]
    pub fn degraded(raw_query: &str, caller_filters: FilterSet) -> Self {
        Self {
            semantic_query: raw_query.trim().to_string(),
            filters: caller_filters,
            degraded: true,
        }
    }

    /// Diet predicates extracted for this query.
    #[must_use]
    pub fn diet_types(&self) -> Vec<DietType> {
        self.filters.diet_types()
    }

    /// Whether the query asked for specific ingredients.
    #[must_use]
    pub fn has_ingredient_query(&self) -> bool {
        self.filters.has_ingredient_query()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degraded_intent_keeps_raw_text() {
        let intent = ParsedIntent::degraded("  creamy mushroom soup ", FilterSet::new());
        assert_eq!(intent.semantic_query, "creamy mushroom soup");
        assert!(intent.degraded);
        assert!(intent.filters.is_empty());
    }
}
