//! Reciprocal Rank Fusion of the two retrieval branches.
//!
//! RRF score = sum over lists of 1 / (k + rank). Rank-based fusion sidesteps
//! the fact that a semantic similarity and a predicate match ratio are not
//! comparable numbers.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::search::core::errors::{SearchError, SearchResult};
use crate::search::core::ids::RecipeId;
use crate::search::retrieval::candidates::CandidateResult;

/// Configuration for rank fusion.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FusionConfig {
    /// RRF smoothing constant k. Higher k reduces the influence of
    /// high-ranking items from any single list.
    pub rrf_k: f64,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self { rrf_k: 60.0 }
    }
}

impl FusionConfig {
    /// Validate fusion invariants.
    ///
    /// k >= 1 keeps the two-term fused score within [0, 1].
    ///
    /// # Errors
    /// Returns `InvalidConfig` for k below 1.
    pub fn validate(&self) -> SearchResult<()> {
        if self.rrf_k < 1.0 {
            return Err(SearchError::InvalidConfig(
                "fusion.rrf_k must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// A candidate after fusion, carrying everything the judge needs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MergedResult {
    /// Candidate recipe.
    pub recipe_id: RecipeId,
    /// Fused RRF score in [0, 1].
    pub fused_score: f64,
    /// 1-indexed rank in the semantic list, if present there.
    pub semantic_rank: Option<usize>,
    /// 1-indexed rank in the filter list, if present there.
    pub filter_rank: Option<usize>,
    /// Raw semantic similarity, if the semantic branch produced it.
    pub semantic_score: Option<f64>,
    /// Raw predicate match ratio, if the filter branch produced it.
    pub filter_score: Option<f64>,
    /// Ingredient match ratio from the filter branch.
    pub ingredient_ratio: Option<f64>,
    /// Diet compliance from the filter branch; unknown for semantic-only hits.
    pub diet_compliant: Option<bool>,
}

impl MergedResult {
    fn new(recipe_id: RecipeId) -> Self {
        Self {
            recipe_id,
            fused_score: 0.0,
            semantic_rank: None,
            filter_rank: None,
            semantic_score: None,
            filter_score: None,
            ingredient_ratio: None,
            diet_compliant: None,
        }
    }

    /// Number of branches that produced this candidate.
    #[must_use]
    pub const fn source_count(&self) -> usize {
        let mut count = 0;
        if self.semantic_rank.is_some() {
            count += 1;
        }
        if self.filter_rank.is_some() {
            count += 1;
        }
        count
    }
}

/// Fuse the two branch lists into one ranking.
///
/// Output is the full union of both lists, sorted by fused score descending;
/// ties rank both-list candidates above single-list ones, then break by
/// recipe id ascending. Inputs must be deduplicated per list (the retriever
/// guarantees this), so each list contributes at most one term.
#[must_use]
pub fn fuse(
    semantic: &[CandidateResult],
    filter: &[CandidateResult],
    config: &FusionConfig,
) -> Vec<MergedResult> {
    let k = config.rrf_k;
    let mut merged: HashMap<RecipeId, MergedResult> = HashMap::new();

    for (index, candidate) in semantic.iter().enumerate() {
        let rank = index + 1;
        let entry = merged
            .entry(candidate.recipe_id)
            .or_insert_with(|| MergedResult::new(candidate.recipe_id));
        #[allow(clippy::cast_precision_loss)]
        {
            entry.fused_score += 1.0 / (k + rank as f64);
        }
        entry.semantic_rank = Some(rank);
        entry.semantic_score = Some(candidate.raw_score);
    }

    for (index, candidate) in filter.iter().enumerate() {
        let rank = index + 1;
        let entry = merged
            .entry(candidate.recipe_id)
            .or_insert_with(|| MergedResult::new(candidate.recipe_id));
        #[allow(clippy::cast_precision_loss)]
        {
            entry.fused_score += 1.0 / (k + rank as f64);
        }
        entry.filter_rank = Some(rank);
        entry.filter_score = Some(candidate.raw_score);
        entry.ingredient_ratio = candidate.ingredient_ratio;
        entry.diet_compliant = candidate.diet_compliant;
    }

    let mut results: Vec<MergedResult> = merged.into_values().collect();
    sort_merged(&mut results);
    results
}

/// Sort merged results by the pipeline's total order: fused score
/// descending, both-branch presence above single-branch, recipe id
/// ascending. Deterministic for identical inputs.
pub fn sort_merged(results: &mut [MergedResult]) {
    results.sort_by(|a, b| {
        b.fused_score
            .total_cmp(&a.fused_score)
            .then_with(|| b.source_count().cmp(&a.source_count()))
            .then_with(|| a.recipe_id.cmp(&b.recipe_id))
    });
}
