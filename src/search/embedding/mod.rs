//! Embedding provider abstraction, rate limiting, retry, and the gateway.

pub mod gateway;
pub mod provider;
pub mod rate_limit;
pub mod retry;

/// Embedding dimensionality fixed across the pipeline. Vectors of any other
/// length are a validation error, never truncated or padded.
pub const EMBEDDING_DIMS: usize = 768;

pub use gateway::EmbeddingGateway;
pub use provider::{EmbedFuture, EmbeddingProvider, EmbeddingTask, OllamaEmbeddingProvider};
pub use rate_limit::RateLimiter;
pub use retry::retry_transient;
