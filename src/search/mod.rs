//! Hybrid recipe search pipeline.
//!
//! The pipeline runs a query through LLM intent parsing, two concurrent
//! retrieval branches (embedding similarity and attribute filters), rank
//! fusion, a configurable relevance judge with fallback strategies, and a
//! TTL result cache. Organized into:
//! - `core`: Configuration, errors, IDs, filters, queries, and intents
//! - `parser`: LLM-assisted query understanding with graceful degradation
//! - `embedding`: Embedding provider, rate limiting, retries, and the gateway
//! - `retrieval`: Branch retrieval, store traits, and rank fusion
//! - `judge`: Threshold filtering and the fallback state machine
//! - `cache`: TTL cache backend, key scheme, and invalidation
//! - `storage`: `SQLite` vector and attribute stores
//! - `pipeline`: Typed stages, response assembly, and the orchestrator

pub mod cache;
pub mod core;
pub mod embedding;
pub mod judge;
pub mod parser;
pub mod pipeline;
pub mod retrieval;
pub mod storage;

// Re-export commonly used types for convenience
pub use cache::{CacheBackend, InMemoryCacheBackend, RecipeEvent, ResultCache};
pub use self::core::{
    CacheConfig, DietType, Difficulty, EmbeddingConfig, FilterSet, LlmConfig, ParsedIntent,
    RateLimitConfig, RecipeFilter, RecipeId, RequestId, RetrievalConfig, RetryConfig,
    SearchConfig, SearchError, SearchOptions, SearchQuery, SearchResult, StorageConfig,
};
pub use embedding::{
    EMBEDDING_DIMS, EmbedFuture, EmbeddingGateway, EmbeddingProvider, EmbeddingTask,
    OllamaEmbeddingProvider, RateLimiter,
};
pub use judge::{
    ConfidenceWeights, FailReason, FallbackStrategy, JudgeConfig, JudgeMetrics, JudgeOutcome,
    JudgeReport, RelevanceJudge,
};
pub use parser::{LlmQueryParser, OllamaTextGenProvider, TextGenProvider};
pub use pipeline::{
    MatchType, RecipeHit, SearchBackends, SearchMetadata, SearchOrchestrator, SearchResponse,
    SearchType,
};
pub use retrieval::{
    AttributeHit, AttributeStore, CandidateRetriever, CandidateSet, DistanceMetric, FusionConfig,
    MergedResult, VectorStore,
};
pub use storage::{
    RecipeRecord, SqliteRecipeAttributeStore, SqliteRecipeVectorStore, init_sqlite_vec_extension,
};

/// Initialize tracing with a basic subscriber.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_env_filter("info").try_init();
}
