//! Store abstractions consumed by the candidate retriever.

use std::future::Future;
use std::pin::Pin;

use crate::search::core::errors::SearchResult;
use crate::search::core::filters::FilterSet;
use crate::search::core::ids::RecipeId;
use crate::search::retrieval::candidates::{AttributeHit, DistanceMetric};

/// Boxed future type for store operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Nearest-neighbor search over recipe embeddings.
pub trait VectorStore: Send + Sync {
    /// Return the top-k nearest recipes with their raw distances, ordered
    /// nearest first.
    ///
    /// # Errors
    /// Returns an error if the store cannot be queried.
    fn nearest_neighbors(
        &self,
        vector: &[f32],
        k: usize,
        metric: DistanceMetric,
    ) -> StoreFuture<'_, SearchResult<Vec<(RecipeId, f64)>>>;
}

/// Attribute-predicate search over recipe metadata.
///
/// Result ordering is not guaranteed by the store; the retriever re-sorts
/// by match ratio.
pub trait AttributeStore: Send + Sync {
    /// Return up to k recipes scored by the fraction of predicates they
    /// satisfy.
    ///
    /// # Errors
    /// Returns an error if the store cannot be queried.
    fn query(
        &self,
        filters: &FilterSet,
        k: usize,
    ) -> StoreFuture<'_, SearchResult<Vec<AttributeHit>>>;
}
