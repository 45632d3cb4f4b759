//! Rate-limited, retrying, cache-backed gateway to the embedding provider.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::search::cache::result_cache::ResultCache;
use crate::search::core::config::RetryConfig;
use crate::search::core::errors::{SearchError, SearchResult};
use crate::search::embedding::EMBEDDING_DIMS;
use crate::search::embedding::provider::{EmbeddingProvider, EmbeddingTask};
use crate::search::embedding::rate_limit::RateLimiter;
use crate::search::embedding::retry::retry_transient;

/// Gateway in front of the embedding provider.
///
/// Embedding lookups are read-through: cached vectors (keyed by the exact
/// input text) skip the rate limiter and the provider entirely. Provider
/// calls pass the process-wide rate limiter first; a rate-limit timeout is
/// surfaced as-is and never retried here.
pub struct EmbeddingGateway {
    provider: Arc<dyn EmbeddingProvider>,
    limiter: Arc<RateLimiter>,
    cache: Arc<ResultCache>,
    retry: RetryConfig,
}

impl EmbeddingGateway {
    /// Create a new gateway.
    #[must_use]
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        limiter: Arc<RateLimiter>,
        cache: Arc<ResultCache>,
        retry: RetryConfig,
    ) -> Self {
        Self {
            provider,
            limiter,
            cache,
            retry,
        }
    }

    /// Embed a text, consulting the embedding cache first. Cache failures
    /// degrade to a provider call; they never fail the embed.
    ///
    /// # Errors
    /// Returns `RateLimitTimeout` if no provider slot frees up in time,
    /// `EmbeddingDimension` for vectors that are not exactly 768 wide, or
    /// the provider error once retries are exhausted.
    pub async fn embed(&self, text: &str, task: EmbeddingTask) -> SearchResult<Vec<f32>> {
        match self.cache.get_embedding(text).await {
            Ok(Some(cached)) => {
                debug!(len = cached.len(), "embedding cache hit");
                return Ok(cached);
            }
            Ok(None) => {}
            Err(error) => warn!(%error, "embedding cache read failed, querying provider"),
        }

        self.limiter.acquire().await?;

        let vector = retry_transient(&self.retry, "embed", || {
            self.provider.embed(text, task)
        })
        .await?;

        if vector.len() != EMBEDDING_DIMS {
            return Err(SearchError::EmbeddingDimension {
                expected: EMBEDDING_DIMS,
                got: vector.len(),
            });
        }

        if let Err(error) = self.cache.put_embedding(text, &vector).await {
            warn!(%error, "embedding cache write failed");
        }
        Ok(vector)
    }
}
