//! Search pipeline orchestration.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::search::cache::backend::{CacheBackend, InMemoryCacheBackend};
use crate::search::cache::keys;
use crate::search::cache::result_cache::{RecipeEvent, ResultCache};
use crate::search::core::config::SearchConfig;
use crate::search::core::errors::SearchResult;
use crate::search::core::ids::RequestId;
use crate::search::core::query::{SearchOptions, SearchQuery};
use crate::search::embedding::gateway::EmbeddingGateway;
use crate::search::embedding::provider::{EmbeddingProvider, OllamaEmbeddingProvider};
use crate::search::embedding::rate_limit::RateLimiter;
use crate::search::judge::relevance::RelevanceJudge;
use crate::search::parser::llm_parser::{LlmQueryParser, OllamaTextGenProvider, TextGenProvider};
use crate::search::pipeline::response::SearchResponse;
use crate::search::pipeline::state::{JudgedStage, ParsedStage};
use crate::search::retrieval::fusion::fuse;
use crate::search::retrieval::retriever::CandidateRetriever;
use crate::search::retrieval::stores::{AttributeStore, VectorStore};
use crate::search::storage::attribute_recipes::SqliteRecipeAttributeStore;
use crate::search::storage::vector_recipes::SqliteRecipeVectorStore;

/// Backend dependencies for the search pipeline.
pub struct SearchBackends {
    /// Text-generation provider for query parsing.
    pub text_gen: Arc<dyn TextGenProvider>,
    /// Embedding provider.
    pub embedding: Arc<dyn EmbeddingProvider>,
    /// Vector store implementation.
    pub vector_store: Arc<dyn VectorStore>,
    /// Attribute store implementation.
    pub attribute_store: Arc<dyn AttributeStore>,
    /// Cache backend implementation.
    pub cache_backend: Arc<dyn CacheBackend>,
}

impl SearchBackends {
    /// Build default backends: Ollama providers, `SQLite` stores, and an
    /// in-memory cache.
    ///
    /// # Errors
    /// Returns an error if any backend cannot be initialized.
    ///
    /// # Note
    /// You must call `init_sqlite_vec_extension()` before calling this
    /// function.
    pub async fn sqlite(config: &SearchConfig) -> SearchResult<Self> {
        let text_gen = Arc::new(OllamaTextGenProvider::new(&config.llm)?);
        let embedding = Arc::new(OllamaEmbeddingProvider::new(&config.embedding)?);
        let vector_store = Arc::new(
            SqliteRecipeVectorStore::new(&config.storage, config.retrieval.distance_metric)
                .await?,
        );
        let attribute_store = Arc::new(SqliteRecipeAttributeStore::new(&config.storage).await?);
        let cache_backend = Arc::new(InMemoryCacheBackend::new(config.cache.clone()));

        Ok(Self {
            text_gen,
            embedding,
            vector_store,
            attribute_store,
            cache_backend,
        })
    }
}

/// Orchestrator running the full pipeline: parse, retrieve, fuse, judge,
/// cache.
pub struct SearchOrchestrator {
    config: SearchConfig,
    parser: LlmQueryParser,
    retriever: CandidateRetriever,
    judge: RelevanceJudge,
    cache: Arc<ResultCache>,
}

impl SearchOrchestrator {
    /// Create a new orchestrator.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn new(config: SearchConfig, backends: SearchBackends) -> SearchResult<Self> {
        config.validate()?;

        let cache = Arc::new(ResultCache::new(
            backends.cache_backend,
            config.cache.clone(),
        ));
        let parser = LlmQueryParser::new(backends.text_gen, &config.llm)?;
        let gateway = Arc::new(EmbeddingGateway::new(
            backends.embedding,
            Arc::new(RateLimiter::new(config.rate_limit.clone())),
            cache.clone(),
            config.retry.clone(),
        ));
        let retriever = CandidateRetriever::new(
            gateway,
            backends.vector_store,
            backends.attribute_store,
            config.retrieval.clone(),
        );
        let judge = RelevanceJudge::new(config.judge.clone());

        Ok(Self {
            config,
            parser,
            retriever,
            judge,
            cache,
        })
    }

    /// Create a new orchestrator using the default `SQLite` backends.
    ///
    /// # Errors
    /// Returns an error if backends cannot be initialized or the
    /// configuration is invalid.
    pub async fn from_config(config: SearchConfig) -> SearchResult<Self> {
        let backends = SearchBackends::sqlite(&config).await?;
        Self::new(config, backends)
    }

    /// Run a search end to end.
    ///
    /// # Errors
    /// Returns `InvalidQuery` for unusable input, `PipelineFailure` when
    /// every enabled retrieval branch failed, or a backend error.
    pub async fn search(
        &self,
        raw_query: &str,
        options: SearchOptions,
    ) -> SearchResult<SearchResponse> {
        let started = Instant::now();
        let query = SearchQuery::new(raw_query, options)?;
        let request_id = RequestId::new();

        let cache_key = keys::search_key(&query);
        if self.config.cache.enabled {
            if let Some(cached) = self.cache.get_response::<SearchResponse>(&cache_key).await? {
                info!(%request_id, key = %cache_key, "served search from cache");
                return Ok(cached);
            }
        }

        let intent = self.parser.parse(&query.text, &query.options.filters).await;
        debug!(
            %request_id,
            semantic_query = %intent.semantic_query,
            degraded = intent.degraded,
            "parsed query intent"
        );
        let parsed = ParsedStage {
            request_id,
            query,
            intent,
        };

        let limit = parsed.query.options.limit.min(self.config.judge.max_results);
        let k = self.config.retrieval.candidate_multiplier * limit;

        let candidates = self
            .retriever
            .retrieve(&parsed.intent, &parsed.query.options, k)
            .await?;
        let retrieved = parsed.retrieved(candidates);

        let fused = fuse(
            &retrieved.candidates.semantic,
            &retrieved.candidates.filter,
            &self.config.fusion,
        );
        let stage = retrieved.fused(fused);

        let judged: JudgedStage = if stage.query.options.use_reranking {
            let verdict = self.judge.judge(&stage.fused, &stage.intent);
            stage.judged(verdict.kept, Some(verdict.report))
        } else {
            let kept = stage.fused.clone();
            stage.judged(kept, None)
        };

        #[allow(clippy::cast_possible_truncation)]
        let elapsed_ms = started.elapsed().as_millis() as u64;
        let response = SearchResponse::from_stage(&judged, limit, elapsed_ms);
        info!(
            %request_id,
            total = response.total,
            partial = response.metadata.partial_retrieval,
            elapsed_ms,
            "search completed"
        );

        if self.config.cache.enabled {
            self.cache.put_response(&cache_key, &response).await?;
        }
        Ok(response)
    }

    /// Invalidate cached search results after a recipe mutation.
    ///
    /// # Errors
    /// Returns an error if the cache backend fails.
    pub async fn handle_recipe_event(&self, event: RecipeEvent) -> SearchResult<usize> {
        self.cache.invalidate_recipe(event).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::core::config::CacheConfig;
    use crate::search::core::errors::SearchError;
    use crate::search::core::filters::{FilterSet, RecipeFilter};
    use crate::search::core::ids::RecipeId;
    use crate::search::embedding::EMBEDDING_DIMS;
    use crate::search::embedding::provider::{EmbedFuture, EmbeddingTask};
    use crate::search::judge::config::FallbackStrategy;
    use crate::search::parser::llm_parser::GenFuture;
    use crate::search::pipeline::response::{MatchType, SearchType};
    use crate::search::retrieval::candidates::{AttributeHit, DistanceMetric};
    use crate::search::retrieval::stores::StoreFuture;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    fn rid(n: u128) -> RecipeId {
        RecipeId::from_uuid(Uuid::from_u128(n))
    }

    struct StubTextGen;

    impl TextGenProvider for StubTextGen {
        fn generate(
            &self,
            _prompt: &str,
            _max_tokens: u64,
            _temperature: f64,
        ) -> GenFuture<'_, SearchResult<String>> {
            Box::pin(async {
                Ok(r#"{"semantic_query": "vegan curry", "diet": ["vegan"], "ingredients": []}"#
                    .to_string())
            })
        }
    }

    struct StubEmbedder;

    impl EmbeddingProvider for StubEmbedder {
        fn embed(
            &self,
            _text: &str,
            _task: EmbeddingTask,
        ) -> EmbedFuture<'_, SearchResult<Vec<f32>>> {
            Box::pin(async { Ok(vec![0.1; EMBEDDING_DIMS]) })
        }

        fn ndims(&self) -> usize {
            EMBEDDING_DIMS
        }
    }

    struct CountingVectorStore {
        hits: Vec<(RecipeId, f64)>,
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingVectorStore {
        fn with_hits(hits: Vec<(RecipeId, f64)>) -> Arc<Self> {
            Arc::new(Self {
                hits,
                calls: AtomicUsize::new(0),
                fail: false,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                hits: Vec::new(),
                calls: AtomicUsize::new(0),
                fail: true,
            })
        }
    }

    impl VectorStore for CountingVectorStore {
        fn nearest_neighbors(
            &self,
            _vector: &[f32],
            _k: usize,
            _metric: DistanceMetric,
        ) -> StoreFuture<'_, SearchResult<Vec<(RecipeId, f64)>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let result = if self.fail {
                Err(SearchError::ProviderTransient("vector down".to_string()))
            } else {
                Ok(self.hits.clone())
            };
            Box::pin(async move { result })
        }
    }

    struct StubAttributeStore {
        hits: Vec<AttributeHit>,
        fail: bool,
    }

    impl AttributeStore for StubAttributeStore {
        fn query(
            &self,
            _filters: &FilterSet,
            _k: usize,
        ) -> StoreFuture<'_, SearchResult<Vec<AttributeHit>>> {
            let result = if self.fail {
                Err(SearchError::ProviderTransient("attrs down".to_string()))
            } else {
                Ok(self.hits.clone())
            };
            Box::pin(async move { result })
        }
    }

    fn attribute_hit(n: u128) -> AttributeHit {
        AttributeHit {
            recipe_id: rid(n),
            match_ratio: 1.0,
            ingredient_ratio: None,
            diet_compliant: true,
        }
    }

    fn test_config() -> SearchConfig {
        let mut config = SearchConfig::default();
        config.retry.max_retries = 0;
        config.judge.min_results = 1;
        config.judge.semantic_threshold = 0.5;
        config.judge.confidence_threshold = 0.0;
        config
    }

    fn orchestrator(
        config: SearchConfig,
        vector_store: Arc<CountingVectorStore>,
        attribute_store: Arc<StubAttributeStore>,
    ) -> SearchOrchestrator {
        let backends = SearchBackends {
            text_gen: Arc::new(StubTextGen),
            embedding: Arc::new(StubEmbedder),
            vector_store,
            attribute_store,
            cache_backend: Arc::new(InMemoryCacheBackend::new(CacheConfig::default())),
        };
        SearchOrchestrator::new(config, backends).expect("orchestrator")
    }

    #[tokio::test]
    async fn test_second_identical_search_is_served_from_cache() {
        let vector_store =
            CountingVectorStore::with_hits(vec![(rid(1), 0.1), (rid(2), 0.2)]);
        let orchestrator = orchestrator(
            test_config(),
            vector_store.clone(),
            Arc::new(StubAttributeStore {
                hits: vec![attribute_hit(1)],
                fail: false,
            }),
        );

        let first = orchestrator
            .search("vegan curry", SearchOptions::default())
            .await
            .expect("first search");
        let second = orchestrator
            .search("vegan curry", SearchOptions::default())
            .await
            .expect("second search");

        assert_eq!(first, second);
        assert_eq!(vector_store.calls.load(Ordering::SeqCst), 1);
        assert_eq!(first.search_type, SearchType::Hybrid);
        assert!(!first.results.is_empty());
    }

    #[tokio::test]
    async fn test_partial_failure_still_returns_results() {
        let orchestrator = orchestrator(
            test_config(),
            CountingVectorStore::failing(),
            Arc::new(StubAttributeStore {
                hits: vec![attribute_hit(1), attribute_hit(2)],
                fail: false,
            }),
        );

        let response = orchestrator
            .search("vegan curry", SearchOptions::default())
            .await
            .expect("partial search");
        assert!(response.metadata.partial_retrieval);
        assert_eq!(response.total, 2);
    }

    #[tokio::test]
    async fn test_both_branches_failing_is_fatal() {
        let orchestrator = orchestrator(
            test_config(),
            CountingVectorStore::failing(),
            Arc::new(StubAttributeStore {
                hits: Vec::new(),
                fail: true,
            }),
        );

        let err = orchestrator
            .search("vegan curry", SearchOptions::default())
            .await
            .expect_err("pipeline failure");
        assert!(matches!(err, SearchError::PipelineFailure { .. }));
    }

    #[tokio::test]
    async fn test_empty_results_fallback_returns_no_hits() {
        let mut config = test_config();
        config.judge.semantic_threshold = 0.99;
        config.judge.filter_compliance_min = 1.0;
        config.judge.min_results = 3;
        config.judge.fallback_strategy = FallbackStrategy::EmptyResults;

        let orchestrator = orchestrator(
            config,
            CountingVectorStore::with_hits(vec![(rid(1), 0.4)]),
            Arc::new(StubAttributeStore {
                hits: Vec::new(),
                fail: false,
            }),
        );

        // Semantic-only so the filter branch never runs.
        let options = SearchOptions {
            use_filters: false,
            ..SearchOptions::default()
        };
        let response = orchestrator
            .search("vegan curry", options)
            .await
            .expect("search");
        assert_eq!(response.total, 0);
        assert!(response.metadata.fallback.is_some());
    }

    #[tokio::test]
    async fn test_reranking_disabled_skips_judge() {
        let orchestrator = orchestrator(
            test_config(),
            CountingVectorStore::with_hits(vec![(rid(1), 0.9)]),
            Arc::new(StubAttributeStore {
                hits: vec![attribute_hit(1)],
                fail: false,
            }),
        );

        // Similarity 0.1 would fail the judge; with reranking off it stays.
        let options = SearchOptions {
            use_reranking: false,
            ..SearchOptions::default()
        };
        let response = orchestrator
            .search("vegan curry", options)
            .await
            .expect("search");
        assert_eq!(response.total, 1);
        assert!(response.results[0].judge_metrics.is_none());
        assert_eq!(response.results[0].match_type, MatchType::Exact);
        assert!(response.metadata.fallback.is_none());
    }

    #[tokio::test]
    async fn test_recipe_event_invalidates_cached_search() {
        let vector_store = CountingVectorStore::with_hits(vec![(rid(1), 0.1)]);
        let orchestrator = orchestrator(
            test_config(),
            vector_store.clone(),
            Arc::new(StubAttributeStore {
                hits: vec![attribute_hit(1)],
                fail: false,
            }),
        );

        orchestrator
            .search("vegan curry", SearchOptions::default())
            .await
            .expect("first search");
        let removed = orchestrator
            .handle_recipe_event(RecipeEvent::Updated(rid(1)))
            .await
            .expect("invalidate");
        assert_eq!(removed, 1);

        orchestrator
            .search("vegan curry", SearchOptions::default())
            .await
            .expect("recomputed search");
        assert_eq!(vector_store.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_caller_filters_reach_the_intent() {
        let orchestrator = orchestrator(
            test_config(),
            CountingVectorStore::with_hits(vec![(rid(1), 0.1)]),
            Arc::new(StubAttributeStore {
                hits: vec![attribute_hit(1)],
                fail: false,
            }),
        );

        let options = SearchOptions {
            filters: FilterSet::from_filters(vec![RecipeFilter::Cuisine(
                "indian".to_string(),
            )]),
            ..SearchOptions::default()
        };
        let response = orchestrator
            .search("vegan curry", options)
            .await
            .expect("search");
        assert!(response.filters.contains("cuisine=indian"));
        assert!(response.filters.contains("diet=vegan"));
    }

    #[tokio::test]
    async fn test_empty_query_is_rejected() {
        let orchestrator = orchestrator(
            test_config(),
            CountingVectorStore::with_hits(Vec::new()),
            Arc::new(StubAttributeStore {
                hits: Vec::new(),
                fail: false,
            }),
        );

        let err = orchestrator
            .search("   ", SearchOptions::default())
            .await
            .expect_err("empty query");
        assert!(matches!(err, SearchError::InvalidQuery(_)));
    }
}
