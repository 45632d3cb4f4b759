//! Stable cache key construction.
//!
//! Search keys hash the normalized query text together with the canonical
//! filter set and feature flags; embedding keys hash the exact input text so
//! the same text always maps to the same stored vector.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::search::core::ids::RecipeId;
use crate::search::core::query::SearchQuery;

/// Key prefix for cached search responses.
pub const SEARCH_PREFIX: &str = "search:";
/// Key prefix for cached embeddings.
pub const EMBEDDING_PREFIX: &str = "embed:";
/// Key prefix for per-recipe cache entries.
pub const RECIPE_PREFIX: &str = "recipe:";

/// Normalize text for hashing (trim, lowercase, collapse whitespace).
#[must_use]
pub fn normalize_text(text: &str) -> String {
    let mut normalized = String::with_capacity(text.len());
    let mut prev_space = false;

    for ch in text.trim().chars() {
        let is_space = ch.is_whitespace();
        if is_space {
            if !prev_space {
                normalized.push(' ');
                prev_space = true;
            }
        } else {
            for lower in ch.to_lowercase() {
                normalized.push(lower);
            }
            prev_space = false;
        }
    }

    normalized
}

/// Compute a stable hex hash for a string.
#[must_use]
pub fn compute_hash(input: &str) -> String {
    let mut hasher = DefaultHasher::new();
    input.hash(&mut hasher);
    let value = hasher.finish();
    format!("{value:016x}")
}

/// Cache key for a search invocation.
#[must_use]
pub fn search_key(query: &SearchQuery) -> String {
    let opts = &query.options;
    let material = format!(
        "{}|{}|{}|{}|{}|{}",
        normalize_text(&query.text),
        opts.filters.canonical_string(),
        opts.limit,
        opts.use_semantic,
        opts.use_filters,
        opts.use_reranking,
    );
    format!("{SEARCH_PREFIX}{}", compute_hash(&material))
}

/// Cache key for an embedding of the exact input text.
#[must_use]
pub fn embedding_key(text: &str) -> String {
    format!("{EMBEDDING_PREFIX}{}", compute_hash(text))
}

/// Cache key for a single recipe's cached entry.
#[must_use]
pub fn recipe_key(id: RecipeId) -> String {
    format!("{RECIPE_PREFIX}{id}")
}
