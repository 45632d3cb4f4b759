//! Typed read-through cache for search responses and embeddings.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::search::cache::backend::CacheBackend;
use crate::search::cache::keys::{self, SEARCH_PREFIX};
use crate::search::core::config::CacheConfig;
use crate::search::core::errors::SearchResult;
use crate::search::core::ids::RecipeId;

/// A recipe mutation event from the persistence layer.
///
/// Any mutation can change any result set's composition, so all cached
/// search responses are invalidated pattern-wide; embedding entries are
/// keyed by text and stay untouched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecipeEvent {
    /// A recipe was created.
    Created(RecipeId),
    /// A recipe was updated.
    Updated(RecipeId),
    /// A recipe was deleted.
    Deleted(RecipeId),
}

impl RecipeEvent {
    /// The recipe the event refers to.
    #[must_use]
    pub const fn recipe_id(&self) -> RecipeId {
        match self {
            Self::Created(id) | Self::Updated(id) | Self::Deleted(id) => *id,
        }
    }
}

/// Typed cache over the backend, owning the TTL policy.
pub struct ResultCache {
    backend: Arc<dyn CacheBackend>,
    config: CacheConfig,
}

impl ResultCache {
    /// Create a new result cache.
    #[must_use]
    pub fn new(backend: Arc<dyn CacheBackend>, config: CacheConfig) -> Self {
        Self { backend, config }
    }

    /// Read a cached search response by key.
    ///
    /// # Errors
    /// Returns an error if the backend fails or the value cannot be decoded.
    pub async fn get_response<T: DeserializeOwned>(&self, key: &str) -> SearchResult<Option<T>> {
        match self.backend.get(key).await? {
            Some(value) => {
                debug!(key, "search cache hit");
                Ok(Some(serde_json::from_value(value)?))
            }
            None => {
                debug!(key, "search cache miss");
                Ok(None)
            }
        }
    }

    /// Write a search response under its key with the search TTL.
    ///
    /// # Errors
    /// Returns an error if the backend fails or the value cannot be encoded.
    pub async fn put_response<T: Serialize>(&self, key: &str, response: &T) -> SearchResult<()> {
        let value = serde_json::to_value(response)?;
        self.backend
            .set(key, value, self.config.search_ttl_seconds)
            .await
    }

    /// Read a cached embedding for the exact input text.
    ///
    /// # Errors
    /// Returns an error if the backend fails or the value cannot be decoded.
    pub async fn get_embedding(&self, text: &str) -> SearchResult<Option<Vec<f32>>> {
        let key = keys::embedding_key(text);
        match self.backend.get(&key).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Write an embedding with the (longer) embedding TTL.
    ///
    /// # Errors
    /// Returns an error if the backend fails or the value cannot be encoded.
    pub async fn put_embedding(&self, text: &str, embedding: &[f32]) -> SearchResult<()> {
        let key = keys::embedding_key(text);
        let value = serde_json::to_value(embedding)?;
        self.backend
            .set(&key, value, self.config.embedding_ttl_seconds)
            .await
    }

    /// Invalidate cache entries affected by a recipe mutation: the recipe's
    /// own entry and every cached search response.
    ///
    /// # Errors
    /// Returns an error if the backend fails.
    pub async fn invalidate_recipe(&self, event: RecipeEvent) -> SearchResult<usize> {
        let recipe_key = keys::recipe_key(event.recipe_id());
        self.backend.delete(&recipe_key).await?;
        let removed = self
            .backend
            .delete_pattern(&format!("{SEARCH_PREFIX}*"))
            .await?;
        debug!(
            recipe = %event.recipe_id(),
            removed, "invalidated search cache after recipe mutation"
        );
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::cache::backend::InMemoryCacheBackend;

    fn cache() -> (ResultCache, Arc<InMemoryCacheBackend>) {
        let config = CacheConfig::default();
        let backend = Arc::new(InMemoryCacheBackend::new(config.clone()));
        (ResultCache::new(backend.clone(), config), backend)
    }

    #[tokio::test]
    async fn test_embedding_roundtrip() {
        let (cache, _) = cache();
        let vector = vec![0.25_f32, -0.5, 0.75];
        cache.put_embedding("pasta", &vector).await.expect("put");
        let read = cache.get_embedding("pasta").await.expect("get");
        assert_eq!(read, Some(vector));
    }

    #[tokio::test]
    async fn test_invalidation_spares_embeddings() {
        let (cache, _) = cache();
        cache.put_embedding("pasta", &[0.1_f32]).await.expect("put");
        cache
            .put_response("search:xyz", &serde_json::json!({"total": 1}))
            .await
            .expect("put");

        let removed = cache
            .invalidate_recipe(RecipeEvent::Updated(RecipeId::new()))
            .await
            .expect("invalidate");
        assert_eq!(removed, 1);
        assert!(
            cache
                .get_embedding("pasta")
                .await
                .expect("get")
                .is_some()
        );
        let gone: Option<serde_json::Value> =
            cache.get_response("search:xyz").await.expect("get");
        assert!(gone.is_none());
    }
}
