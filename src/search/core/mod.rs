//! Core types for the search pipeline: configuration, errors, ids, filters,
//! queries, and parsed intent.

pub mod config;
pub mod errors;
pub mod filters;
pub mod ids;
pub mod intent;
pub mod query;

pub use config::{
    CacheConfig, EmbeddingConfig, LlmConfig, RateLimitConfig, RetrievalConfig, RetryConfig,
    SearchConfig, StorageConfig,
};
pub use errors::{SearchError, SearchResult};
pub use filters::{DietType, Difficulty, FilterSet, RecipeFilter};
pub use ids::{RecipeId, RequestId};
pub use intent::ParsedIntent;
pub use query::{SearchOptions, SearchQuery};
