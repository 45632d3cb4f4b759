//! Configuration for the search pipeline.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::search::core::errors::{SearchError, SearchResult};
use crate::search::judge::config::JudgeConfig;
use crate::search::retrieval::candidates::DistanceMetric;
use crate::search::retrieval::fusion::FusionConfig;

/// Top-level configuration for the search pipeline.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Completion model settings (query parsing).
    pub llm: LlmConfig,
    /// Embedding model settings.
    pub embedding: EmbeddingConfig,
    /// Embedding-provider rate limit settings.
    pub rate_limit: RateLimitConfig,
    /// Transient-failure retry settings.
    pub retry: RetryConfig,
    /// Candidate retrieval settings.
    pub retrieval: RetrievalConfig,
    /// Rank fusion settings.
    pub fusion: FusionConfig,
    /// Relevance judge thresholds and fallback policy.
    pub judge: JudgeConfig,
    /// Result and embedding cache settings.
    pub cache: CacheConfig,
    /// `SQLite` storage settings.
    pub storage: StorageConfig,
}

impl SearchConfig {
    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any values are out of range or invalid.
    pub fn validate(&self) -> SearchResult<()> {
        if self.llm.model.trim().is_empty() {
            return Err(SearchError::InvalidConfig(
                "llm.model must not be empty".to_string(),
            ));
        }
        if self.embedding.model.trim().is_empty() {
            return Err(SearchError::InvalidConfig(
                "embedding.model must not be empty".to_string(),
            ));
        }
        if self.rate_limit.max_per_minute == 0 {
            return Err(SearchError::InvalidConfig(
                "rate_limit.max_per_minute must be > 0".to_string(),
            ));
        }
        if self.retrieval.candidate_multiplier < 2 {
            return Err(SearchError::InvalidConfig(
                "retrieval.candidate_multiplier must be >= 2".to_string(),
            ));
        }
        if self.cache.search_ttl_seconds == 0 || self.cache.embedding_ttl_seconds == 0 {
            return Err(SearchError::InvalidConfig(
                "cache TTLs must be > 0".to_string(),
            ));
        }
        if self.cache.max_entries == 0 {
            return Err(SearchError::InvalidConfig(
                "cache.max_entries must be > 0".to_string(),
            ));
        }

        if let Some(base_url) = &self.llm.base_url {
            Url::parse(base_url)?;
        }
        if let Some(base_url) = &self.embedding.base_url {
            Url::parse(base_url)?;
        }

        self.fusion.validate()?;
        self.judge.validate()?;

        Ok(())
    }
}

/// Completion model settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Ollama completion model name.
    pub model: String,
    /// Max tokens for the extraction response.
    pub max_tokens: u64,
    /// Optional custom base URL.
    pub base_url: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "ministral-3:8b-instruct-2512-q8_0".to_string(),
            max_tokens: 512,
            base_url: None,
        }
    }
}

/// Embedding model settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Ollama embedding model name.
    pub model: String,
    /// Optional custom base URL.
    pub base_url: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "nomic-embed-text".to_string(),
            base_url: None,
        }
    }
}

/// Embedding-provider rate limit settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum embedding-provider calls per minute, process-wide.
    pub max_per_minute: usize,
    /// How long a caller may wait for a slot before failing.
    pub acquire_timeout_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_per_minute: 60,
            acquire_timeout_ms: 10_000,
        }
    }
}

/// Transient-failure retry settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum retry attempts after the initial call.
    pub max_retries: u32,
    /// Base delay for exponential backoff.
    pub base_delay_ms: u64,
    /// Cap on a single backoff delay.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 200,
            max_delay_ms: 5_000,
        }
    }
}

/// Candidate retrieval settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Per-branch candidate count as a multiple of the effective limit.
    /// Gives fusion headroom beyond the final result count.
    pub candidate_multiplier: usize,
    /// Distance metric for nearest-neighbor search.
    pub distance_metric: DistanceMetric,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            candidate_multiplier: 3,
            distance_metric: DistanceMetric::Cosine,
        }
    }
}

/// Result and embedding cache settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Whether caching is enabled.
    pub enabled: bool,
    /// TTL for cached search responses.
    pub search_ttl_seconds: u64,
    /// TTL for cached embeddings. Longer than the search TTL: embeddings are
    /// keyed by text and survive recipe mutations.
    pub embedding_ttl_seconds: u64,
    /// Upper bound on entries per cache before eviction.
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            search_ttl_seconds: 300,
            embedding_ttl_seconds: 3_600,
            max_entries: 4_096,
        }
    }
}

/// `SQLite` storage settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// `SQLite` database path.
    pub sqlite_path: PathBuf,
    /// Recipe attribute table name.
    pub recipes_table: String,
    /// Recipe embedding virtual table name.
    pub embeddings_table: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            sqlite_path: PathBuf::from("recipes.sqlite"),
            recipes_table: "recipes".to_string(),
            embeddings_table: "recipe_embeddings".to_string(),
        }
    }
}
