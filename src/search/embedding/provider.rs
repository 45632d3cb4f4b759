//! Embedding provider abstraction and the Rig + Ollama implementation.

use std::future::Future;
use std::pin::Pin;

use reqwest::Client as ReqwestClient;
use rig::client::{EmbeddingsClient, Nothing};
use rig::embeddings::EmbeddingModel;
use rig::providers::ollama;

use crate::search::core::config::EmbeddingConfig;
use crate::search::core::errors::{SearchError, SearchResult};
use crate::search::embedding::EMBEDDING_DIMS;

/// Boxed future type for embedding operations.
pub type EmbedFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// What the embedded text is used for. Embedding models that distinguish
/// query and document inputs (e.g. nomic) prefix the text accordingly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmbeddingTask {
    /// Search query text.
    Query,
    /// Stored document (recipe) text.
    Document,
}

/// Trait abstraction over embedding providers.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text string for the given task.
    ///
    /// # Errors
    /// Returns an error if the embedding request fails.
    fn embed(&self, text: &str, task: EmbeddingTask) -> EmbedFuture<'_, SearchResult<Vec<f32>>>;
    /// Return embedding dimensionality.
    fn ndims(&self) -> usize;
}

type OllamaEmbeddingModel = ollama::EmbeddingModel<ReqwestClient>;

/// Ollama embedding provider using Rig.
#[derive(Clone)]
pub struct OllamaEmbeddingProvider {
    model: OllamaEmbeddingModel,
}

impl OllamaEmbeddingProvider {
    /// Create a new Ollama embedding provider from config.
    ///
    /// # Errors
    /// Returns an error if the client cannot be built.
    pub fn new(config: &EmbeddingConfig) -> SearchResult<Self> {
        let builder = ollama::Client::<ReqwestClient>::builder().api_key(Nothing);
        let builder = if let Some(base_url) = &config.base_url {
            builder.base_url(base_url)
        } else {
            builder
        };
        let client = builder.build().map_err(SearchError::from)?;
        let model = client.embedding_model_with_ndims(config.model.clone(), EMBEDDING_DIMS);
        Ok(Self { model })
    }
}

impl EmbeddingProvider for OllamaEmbeddingProvider {
    fn embed(&self, text: &str, task: EmbeddingTask) -> EmbedFuture<'_, SearchResult<Vec<f32>>> {
        // nomic-style task prefixes
        let prefixed = match task {
            EmbeddingTask::Query => format!("search_query: {text}"),
            EmbeddingTask::Document => format!("search_document: {text}"),
        };
        Box::pin(async move {
            let embedding = self
                .model
                .embed_text(&prefixed)
                .await
                .map_err(SearchError::Embedding)?;
            #[allow(clippy::cast_possible_truncation)]
            let vector: Vec<f32> = embedding.vec.iter().map(|v| *v as f32).collect();
            Ok(vector)
        })
    }

    fn ndims(&self) -> usize {
        EMBEDDING_DIMS
    }
}
