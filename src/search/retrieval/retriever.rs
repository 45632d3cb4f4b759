//! Concurrent two-branch candidate retrieval.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::search::core::config::RetrievalConfig;
use crate::search::core::errors::{SearchError, SearchResult};
use crate::search::core::filters::FilterSet;
use crate::search::core::intent::ParsedIntent;
use crate::search::core::query::SearchOptions;
use crate::search::embedding::gateway::EmbeddingGateway;
use crate::search::embedding::provider::EmbeddingTask;
use crate::search::retrieval::candidates::{CandidateResult, CandidateSet};
use crate::search::retrieval::stores::{AttributeStore, VectorStore};

/// Outcome of one retrieval branch.
enum BranchOutcome {
    /// Branch ran and produced candidates.
    Ok(Vec<CandidateResult>),
    /// Branch ran and failed after its own retries.
    Failed(SearchError),
    /// Branch was disabled by a feature flag or had nothing to do.
    Disabled,
}

/// Retriever issuing the semantic and filter branches concurrently.
///
/// Failure policy: one failed branch degrades the set to `partial`; all
/// enabled branches failing is a `PipelineFailure`. A disabled branch never
/// counts as failed.
pub struct CandidateRetriever {
    gateway: Arc<EmbeddingGateway>,
    vector_store: Arc<dyn VectorStore>,
    attribute_store: Arc<dyn AttributeStore>,
    config: RetrievalConfig,
}

impl CandidateRetriever {
    /// Create a new retriever.
    #[must_use]
    pub fn new(
        gateway: Arc<EmbeddingGateway>,
        vector_store: Arc<dyn VectorStore>,
        attribute_store: Arc<dyn AttributeStore>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            gateway,
            vector_store,
            attribute_store,
            config,
        }
    }

    /// Retrieve both branch candidate lists, capped at k per branch.
    ///
    /// # Errors
    /// Returns `PipelineFailure` when every enabled branch failed.
    pub async fn retrieve(
        &self,
        intent: &ParsedIntent,
        options: &SearchOptions,
        k: usize,
    ) -> SearchResult<CandidateSet> {
        let semantic_enabled = options.use_semantic;
        // An empty predicate set would match everything at ratio 1.0, which
        // is noise rather than retrieval; skip the branch instead.
        let filter_enabled = options.use_filters && !intent.filters.is_empty();

        let semantic_fut = async {
            if semantic_enabled {
                match self.semantic_branch(intent, k).await {
                    Ok(candidates) => BranchOutcome::Ok(candidates),
                    Err(err) => BranchOutcome::Failed(err),
                }
            } else {
                BranchOutcome::Disabled
            }
        };
        let filter_fut = async {
            if filter_enabled {
                match self.filter_branch(&intent.filters, k).await {
                    Ok(candidates) => BranchOutcome::Ok(candidates),
                    Err(err) => BranchOutcome::Failed(err),
                }
            } else {
                BranchOutcome::Disabled
            }
        };

        let (semantic, filter) = tokio::join!(semantic_fut, filter_fut);

        match (semantic, filter) {
            (BranchOutcome::Failed(sem_err), BranchOutcome::Failed(fil_err)) => {
                Err(SearchError::PipelineFailure {
                    semantic: sem_err.to_string(),
                    filter: fil_err.to_string(),
                })
            }
            (BranchOutcome::Failed(err), BranchOutcome::Disabled) => {
                Err(SearchError::PipelineFailure {
                    semantic: err.to_string(),
                    filter: "disabled".to_string(),
                })
            }
            (BranchOutcome::Disabled, BranchOutcome::Failed(err)) => {
                Err(SearchError::PipelineFailure {
                    semantic: "disabled".to_string(),
                    filter: err.to_string(),
                })
            }
            (BranchOutcome::Failed(err), BranchOutcome::Ok(filter)) => {
                warn!(error = %err, "semantic branch failed, continuing with filter results");
                Ok(CandidateSet {
                    semantic: Vec::new(),
                    filter,
                    partial: true,
                })
            }
            (BranchOutcome::Ok(semantic), BranchOutcome::Failed(err)) => {
                warn!(error = %err, "filter branch failed, continuing with semantic results");
                Ok(CandidateSet {
                    semantic,
                    filter: Vec::new(),
                    partial: true,
                })
            }
            (semantic, filter) => {
                let semantic = match semantic {
                    BranchOutcome::Ok(candidates) => candidates,
                    _ => Vec::new(),
                };
                let filter = match filter {
                    BranchOutcome::Ok(candidates) => candidates,
                    _ => Vec::new(),
                };
                debug!(
                    semantic = semantic.len(),
                    filter = filter.len(),
                    "retrieved candidates"
                );
                Ok(CandidateSet {
                    semantic,
                    filter,
                    partial: false,
                })
            }
        }
    }

    async fn semantic_branch(
        &self,
        intent: &ParsedIntent,
        k: usize,
    ) -> SearchResult<Vec<CandidateResult>> {
        let vector = self
            .gateway
            .embed(&intent.semantic_query, EmbeddingTask::Query)
            .await?;
        let neighbors = self
            .vector_store
            .nearest_neighbors(&vector, k, self.config.distance_metric)
            .await?;

        let mut seen = HashSet::new();
        let mut candidates = Vec::with_capacity(neighbors.len());
        for (recipe_id, distance) in neighbors {
            if !seen.insert(recipe_id) {
                continue;
            }
            let raw_score = self.config.distance_metric.raw_score(distance);
            candidates.push(CandidateResult::semantic(recipe_id, raw_score));
        }
        candidates.truncate(k);
        Ok(candidates)
    }

    async fn filter_branch(
        &self,
        filters: &FilterSet,
        k: usize,
    ) -> SearchResult<Vec<CandidateResult>> {
        let mut hits = self.attribute_store.query(filters, k).await?;

        // Store ordering is not guaranteed.
        hits.sort_by(|a, b| {
            b.match_ratio
                .total_cmp(&a.match_ratio)
                .then_with(|| a.recipe_id.cmp(&b.recipe_id))
        });

        let mut seen = HashSet::new();
        let mut candidates = Vec::with_capacity(hits.len());
        for hit in &hits {
            if !seen.insert(hit.recipe_id) {
                continue;
            }
            candidates.push(CandidateResult::filter(hit));
        }
        candidates.truncate(k);
        Ok(candidates)
    }
}
