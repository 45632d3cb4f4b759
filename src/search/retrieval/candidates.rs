//! Candidate types shared by the retrieval branches and fusion.

use serde::{Deserialize, Serialize};

use crate::search::core::ids::RecipeId;

/// Distance metric for nearest-neighbor search.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Cosine distance (1 - cosine similarity).
    Cosine,
    /// Euclidean distance.
    L2,
    /// Negative inner product.
    InnerProduct,
}

impl DistanceMetric {
    /// Convert a raw store distance into a similarity in [0, 1], higher
    /// meaning closer. The judge thresholds this value directly, so every
    /// metric must land on the same bounded scale.
    ///
    /// Cosine yields `1 - distance` clamped so a self-match (distance 0)
    /// scores exactly 1.0; L2 maps through `1 / (1 + d)`; inner product
    /// (stores report the negated dot product) maps through a logistic.
    #[must_use]
    pub fn raw_score(&self, distance: f64) -> f64 {
        match self {
            Self::Cosine => (1.0 - distance).clamp(0.0, 1.0),
            Self::L2 => 1.0 / (1.0 + distance.max(0.0)),
            Self::InnerProduct => 1.0 / (1.0 + distance.exp()),
        }
    }

    /// Metric name as used by the vector table declaration.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cosine => "cosine",
            Self::L2 => "l2",
            Self::InnerProduct => "ip",
        }
    }
}

/// Which retrieval branch produced a candidate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    /// Embedding similarity search.
    Semantic,
    /// Attribute-filter search.
    Filter,
}

/// A hit from the attribute store with per-predicate detail.
#[derive(Clone, Debug, PartialEq)]
pub struct AttributeHit {
    /// Matched recipe.
    pub recipe_id: RecipeId,
    /// Fraction of predicates the recipe satisfies, in [0, 1].
    pub match_ratio: f64,
    /// Fraction of queried ingredients present, if ingredients were queried.
    pub ingredient_ratio: Option<f64>,
    /// Whether every diet predicate is exactly satisfied.
    pub diet_compliant: bool,
}

/// One candidate from a single retrieval branch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CandidateResult {
    /// Candidate recipe.
    pub recipe_id: RecipeId,
    /// Raw branch score: similarity for the semantic branch, predicate
    /// match ratio for the filter branch. Not comparable across branches.
    pub raw_score: f64,
    /// Producing branch.
    pub source: CandidateSource,
    /// Ingredient match ratio (filter branch only).
    pub ingredient_ratio: Option<f64>,
    /// Diet compliance (filter branch only; unknown for semantic-only hits).
    pub diet_compliant: Option<bool>,
}

impl CandidateResult {
    /// Build a semantic-branch candidate.
    #[must_use]
    pub const fn semantic(recipe_id: RecipeId, raw_score: f64) -> Self {
        Self {
            recipe_id,
            raw_score,
            source: CandidateSource::Semantic,
            ingredient_ratio: None,
            diet_compliant: None,
        }
    }

    /// Build a filter-branch candidate from an attribute hit.
    #[must_use]
    pub const fn filter(hit: &AttributeHit) -> Self {
        Self {
            recipe_id: hit.recipe_id,
            raw_score: hit.match_ratio,
            source: CandidateSource::Filter,
            ingredient_ratio: hit.ingredient_ratio,
            diet_compliant: Some(hit.diet_compliant),
        }
    }
}

/// Output of the candidate retriever: both branch lists, ordered and capped.
#[derive(Clone, Debug, Default)]
pub struct CandidateSet {
    /// Semantic branch candidates, best first.
    pub semantic: Vec<CandidateResult>,
    /// Filter branch candidates, best first.
    pub filter: Vec<CandidateResult>,
    /// Whether one branch failed and the set is degraded.
    pub partial: bool,
}

impl CandidateSet {
    /// Whether neither branch produced any candidates.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.semantic.is_empty() && self.filter.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_self_match_scores_one() {
        assert!((DistanceMetric::Cosine.raw_score(0.0) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_cosine_score_clamped() {
        assert!((DistanceMetric::Cosine.raw_score(1.8) - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_l2_self_match_scores_one() {
        assert!((DistanceMetric::L2.raw_score(0.0) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_l2_score_decreases_with_distance() {
        let close = DistanceMetric::L2.raw_score(0.1);
        let far = DistanceMetric::L2.raw_score(9.0);
        assert!(far < close);
        assert!((0.0..=1.0).contains(&far));
    }

    #[test]
    fn test_inner_product_score_is_bounded_and_monotone() {
        let strong = DistanceMetric::InnerProduct.raw_score(-50.0);
        let neutral = DistanceMetric::InnerProduct.raw_score(0.0);
        let weak = DistanceMetric::InnerProduct.raw_score(50.0);
        assert!(weak < neutral && neutral < strong);
        assert!((0.0..=1.0).contains(&weak) && (0.0..=1.0).contains(&strong));
    }
}
