//! Per-candidate judge metrics and scoring.

use serde::{Deserialize, Serialize};

use crate::search::core::intent::ParsedIntent;
use crate::search::judge::config::ConfidenceWeights;
use crate::search::retrieval::fusion::MergedResult;

/// Why a candidate failed the filtering rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailReason {
    /// Semantic similarity below the threshold.
    SemanticBelowThreshold,
    /// Filter compliance ratio below the minimum.
    FilterComplianceBelow,
    /// Ingredient match ratio below the minimum.
    IngredientMatchBelow,
    /// Combined confidence below the threshold.
    ConfidenceBelow,
    /// A diet predicate is violated or unverifiable under strict mode.
    DietaryViolation,
}

/// Scoring detail for one fused candidate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JudgeMetrics {
    /// Semantic similarity, 0.0 when the semantic branch did not see the
    /// candidate.
    pub semantic_similarity: f64,
    /// Filter compliance ratio.
    pub filter_compliance: f64,
    /// Ingredient match ratio; 1.0 when no ingredients were queried.
    pub ingredient_match: f64,
    /// Weighted combination of the three ratios.
    pub confidence: f64,
    /// Whether the candidate passed the filtering rule.
    pub passed: bool,
    /// Threshold failures, empty when passed.
    pub fail_reasons: Vec<FailReason>,
}

impl JudgeMetrics {
    /// Compute the raw ratios and confidence for a fused candidate. The
    /// pass/fail decision is applied separately so relaxation can re-judge
    /// the same metrics against different thresholds.
    ///
    /// Defaults when a branch did not see the candidate: semantic
    /// similarity 0.0; filter compliance 1.0 when no filters were asked
    /// for, otherwise 0.0; ingredient match 1.0 when no ingredients were
    /// queried, otherwise 0.0.
    #[must_use]
    pub fn score(
        candidate: &MergedResult,
        intent: &ParsedIntent,
        weights: &ConfidenceWeights,
    ) -> Self {
        let semantic_similarity = candidate.semantic_score.unwrap_or(0.0);

        let filter_compliance = if intent.filters.is_empty() {
            1.0
        } else {
            candidate.filter_score.unwrap_or(0.0)
        };

        let ingredient_match = if intent.has_ingredient_query() {
            candidate.ingredient_ratio.unwrap_or(0.0)
        } else {
            1.0
        };

        let total = weights.total();
        let confidence = (weights.semantic * semantic_similarity
            + weights.filter * filter_compliance
            + weights.ingredient * ingredient_match)
            / total;

        Self {
            semantic_similarity,
            filter_compliance,
            ingredient_match,
            confidence,
            passed: false,
            fail_reasons: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::core::filters::{DietType, FilterSet, RecipeFilter};
    use crate::search::core::ids::RecipeId;
    use uuid::Uuid;

    fn merged(semantic: Option<f64>, filter: Option<f64>) -> MergedResult {
        MergedResult {
            recipe_id: RecipeId::from_uuid(Uuid::from_u128(1)),
            fused_score: 0.03,
            semantic_rank: semantic.map(|_| 1),
            filter_rank: filter.map(|_| 1),
            semantic_score: semantic,
            filter_score: filter,
            ingredient_ratio: None,
            diet_compliant: filter.map(|_| true),
        }
    }

    #[test]
    fn test_no_filters_yields_full_compliance() {
        let intent = ParsedIntent::new("pasta".to_string(), FilterSet::new());
        let metrics = JudgeMetrics::score(
            &merged(Some(0.8), None),
            &intent,
            &ConfidenceWeights::default(),
        );
        assert!((metrics.filter_compliance - 1.0).abs() < f64::EPSILON);
        assert!((metrics.ingredient_match - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_filters_present_but_candidate_unmatched_scores_zero() {
        let intent = ParsedIntent::new(
            "pasta".to_string(),
            FilterSet::from_filters(vec![RecipeFilter::Diet(DietType::Vegan)]),
        );
        let metrics = JudgeMetrics::score(
            &merged(Some(0.8), None),
            &intent,
            &ConfidenceWeights::default(),
        );
        assert!((metrics.filter_compliance - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_confidence_is_weight_normalized() {
        let intent = ParsedIntent::new("pasta".to_string(), FilterSet::new());
        let weights = ConfidenceWeights {
            semantic: 1.0,
            filter: 1.0,
            ingredient: 1.0,
        };
        let metrics = JudgeMetrics::score(&merged(Some(0.6), Some(0.9)), &intent, &weights);
        // filter_compliance defaults to 1.0 (no filters), ingredient 1.0.
        let expected = (0.6 + 1.0 + 1.0) / 3.0;
        assert!((metrics.confidence - expected).abs() < 1e-12);
    }

    #[test]
    fn test_missing_ingredient_ratio_with_query_scores_zero() {
        let intent = ParsedIntent::new(
            "pasta".to_string(),
            FilterSet::from_filters(vec![RecipeFilter::Ingredient("basil".to_string())]),
        );
        let metrics = JudgeMetrics::score(
            &merged(Some(0.8), None),
            &intent,
            &ConfidenceWeights::default(),
        );
        assert!((metrics.ingredient_match - 0.0).abs() < f64::EPSILON);
    }
}
