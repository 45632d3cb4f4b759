//! Caller-facing search response types.

use serde::{Deserialize, Serialize};

use crate::search::core::ids::{RecipeId, RequestId};
use crate::search::judge::relevance::JudgeOutcome;
use crate::search::judge::metrics::JudgeMetrics;
use crate::search::pipeline::state::JudgedStage;

/// How a result qualified for inclusion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    /// Passed the judge at the configured thresholds, or reranking was
    /// disabled.
    Exact,
    /// Passed only after threshold relaxation.
    Relaxed,
    /// Returned as an alternative suggestion, numeric thresholds bypassed.
    Alternative,
}

/// Which retrieval branches ran for a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchType {
    /// Both branches enabled.
    Hybrid,
    /// Semantic branch only.
    Semantic,
    /// Filter branch only.
    Filter,
}

/// One result in the final ranking.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecipeHit {
    /// Matched recipe.
    pub recipe_id: RecipeId,
    /// Fused RRF score.
    pub fused_score: f64,
    /// Judge scoring detail; absent when reranking was disabled.
    pub judge_metrics: Option<JudgeMetrics>,
    /// How the result qualified.
    pub match_type: MatchType,
}

/// Request-level metadata attached to every response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchMetadata {
    /// Correlation id for this invocation.
    pub request_id: RequestId,
    /// Whether one retrieval branch failed and results are degraded.
    pub partial_retrieval: bool,
    /// Whether LLM intent extraction failed and the raw query was used.
    pub degraded_parse: bool,
    /// Fallback path the judge took, if one fired.
    pub fallback: Option<JudgeOutcome>,
    /// Wall-clock pipeline duration. A cache hit returns the originally
    /// cached response unmodified, this field included.
    pub elapsed_ms: u64,
}

/// Complete response for one search invocation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Raw query text, trimmed.
    pub query: String,
    /// Semantic query actually embedded.
    pub semantic_query: String,
    /// Canonical form of the effective filter set.
    pub filters: String,
    /// Ranked results.
    pub results: Vec<RecipeHit>,
    /// Number of results returned.
    pub total: usize,
    /// Which branches ran.
    pub search_type: SearchType,
    /// Request-level metadata.
    pub metadata: SearchMetadata,
}

impl SearchResponse {
    /// Assemble the response from the final pipeline stage.
    #[must_use]
    pub fn from_stage(stage: &JudgedStage, limit: usize, elapsed_ms: u64) -> Self {
        let match_type = stage.report.as_ref().map_or(MatchType::Exact, |report| {
            match report.outcome {
                JudgeOutcome::Passed | JudgeOutcome::Empty => MatchType::Exact,
                JudgeOutcome::Relaxed { .. } => MatchType::Relaxed,
                JudgeOutcome::Suggested => MatchType::Alternative,
            }
        });

        let results: Vec<RecipeHit> = stage
            .kept
            .iter()
            .take(limit)
            .map(|candidate| RecipeHit {
                recipe_id: candidate.recipe_id,
                fused_score: candidate.fused_score,
                judge_metrics: stage
                    .report
                    .as_ref()
                    .and_then(|report| report.metrics_for(candidate.recipe_id))
                    .cloned(),
                match_type,
            })
            .collect();

        let options = &stage.query.options;
        let search_type = match (options.use_semantic, options.use_filters) {
            (true, false) => SearchType::Semantic,
            (false, _) => SearchType::Filter,
            (true, true) => SearchType::Hybrid,
        };

        let total = results.len();
        Self {
            query: stage.query.text.clone(),
            semantic_query: stage.intent.semantic_query.clone(),
            filters: stage.intent.filters.canonical_string(),
            results,
            total,
            search_type,
            metadata: SearchMetadata {
                request_id: stage.request_id,
                partial_retrieval: stage.partial,
                degraded_parse: stage.intent.degraded,
                fallback: stage.report.as_ref().and_then(|report| match report.outcome {
                    JudgeOutcome::Passed => None,
                    taken => Some(taken),
                }),
                elapsed_ms,
            },
        }
    }
}
