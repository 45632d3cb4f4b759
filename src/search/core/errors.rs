//! Error types for the search pipeline.

use thiserror::Error;

/// Search pipeline error type.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Invalid configuration or unsupported values.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Invalid query text or options.
    #[error("invalid query: {0}")]
    InvalidQuery(String),
    /// Malformed or unsupported filter predicate.
    #[error("invalid filter: {0}")]
    InvalidFilter(String),
    /// Embedding vector has the wrong dimensionality.
    #[error("embedding dimension mismatch: expected {expected}, got {got}")]
    EmbeddingDimension {
        /// Required dimensionality.
        expected: usize,
        /// Dimensionality actually returned.
        got: usize,
    },
    /// Retryable upstream provider failure (network, 5xx).
    #[error("transient provider error: {0}")]
    ProviderTransient(String),
    /// Upstream provider call timed out.
    #[error("provider timed out: {0}")]
    ProviderTimeout(String),
    /// Non-retryable upstream provider failure (4xx, malformed input).
    #[error("provider error: {0}")]
    ProviderFatal(String),
    /// Rate limiter acquisition exceeded the configured wait timeout.
    #[error("rate limit acquisition timed out after {waited_ms} ms")]
    RateLimitTimeout {
        /// Milliseconds spent waiting before giving up.
        waited_ms: u64,
    },
    /// Both retrieval branches failed; the search cannot produce results.
    #[error("pipeline failure: semantic branch: {semantic}; filter branch: {filter}")]
    PipelineFailure {
        /// Failure description from the semantic branch.
        semantic: String,
        /// Failure description from the filter branch.
        filter: String,
    },
    /// `SQLite` storage error (sync).
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// `SQLite` storage error (async).
    #[error("tokio-rusqlite error: {0}")]
    TokioSqlite(#[from] tokio_rusqlite::Error),
    /// Embedding provider error.
    #[error("embedding error: {0}")]
    Embedding(#[from] rig::embeddings::EmbeddingError),
    /// Completion provider error.
    #[error("completion error: {0}")]
    Completion(#[from] rig::completion::CompletionError),
    /// HTTP client error from Rig.
    #[error("http client error: {0}")]
    HttpClient(#[from] rig::http_client::Error),
    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// URL parse error.
    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl SearchError {
    /// Whether the retry policy may re-attempt the failed operation.
    ///
    /// Provider-side network failures and timeouts are retryable; validation
    /// errors, rate-limit timeouts, and fatal provider responses are not.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ProviderTransient(_)
                | Self::ProviderTimeout(_)
                | Self::Embedding(_)
                | Self::Completion(_)
                | Self::HttpClient(_)
                | Self::Io(_)
        )
    }
}

/// Convenience result alias for search operations.
pub type SearchResult<T> = Result<T, SearchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(SearchError::ProviderTransient("503".to_string()).is_transient());
        assert!(SearchError::ProviderTimeout("embed".to_string()).is_transient());
        assert!(!SearchError::ProviderFatal("400".to_string()).is_transient());
        assert!(!SearchError::InvalidQuery("empty".to_string()).is_transient());
        assert!(!SearchError::RateLimitTimeout { waited_ms: 5000 }.is_transient());
    }
}
