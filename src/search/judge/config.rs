//! Relevance judge thresholds and fallback policy.

use serde::{Deserialize, Serialize};

use crate::search::core::errors::{SearchError, SearchResult};

/// What the judge does when fewer than `min_results` candidates survive
/// filtering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackStrategy {
    /// Step all numeric thresholds down and re-filter the original fused
    /// set until enough candidates survive or the thresholds reach zero.
    RelaxThresholds,
    /// Return an empty result list unconditionally.
    EmptyResults,
    /// Ignore numeric thresholds (dietary strictness still applies) and
    /// return the top of the fused set tagged as alternatives.
    SuggestAlternatives,
}

/// Weights for the confidence combination of the three per-candidate
/// ratios. Normalized by their sum at evaluation time.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ConfidenceWeights {
    /// Weight of semantic similarity.
    pub semantic: f64,
    /// Weight of filter compliance.
    pub filter: f64,
    /// Weight of ingredient match.
    pub ingredient: f64,
}

impl Default for ConfidenceWeights {
    fn default() -> Self {
        Self {
            semantic: 0.5,
            filter: 0.3,
            ingredient: 0.2,
        }
    }
}

impl ConfidenceWeights {
    /// Sum of all weights. Must be positive for confidence to be defined.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.semantic + self.filter + self.ingredient
    }
}

/// Immutable thresholds and fallback policy for the relevance judge.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JudgeConfig {
    /// Minimum semantic similarity to keep a candidate.
    pub semantic_threshold: f64,
    /// Minimum filter compliance ratio to keep a candidate.
    pub filter_compliance_min: f64,
    /// Minimum ingredient match ratio to keep a candidate.
    pub ingredient_match_min: f64,
    /// Minimum combined confidence to keep a candidate.
    pub confidence_threshold: f64,
    /// When set, every diet predicate must be exactly satisfied; never
    /// relaxed by any fallback.
    pub dietary_strict_mode: bool,
    /// Kept-count below this triggers the fallback strategy.
    pub min_results: usize,
    /// Final result list is truncated to this length.
    pub max_results: usize,
    /// Per-iteration decrement applied to all four numeric thresholds
    /// during `RelaxThresholds`.
    pub relax_step: f64,
    /// What to do when too few candidates survive.
    pub fallback_strategy: FallbackStrategy,
    /// Confidence combination weights.
    pub confidence_weights: ConfidenceWeights,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            semantic_threshold: 0.6,
            filter_compliance_min: 0.5,
            ingredient_match_min: 0.3,
            confidence_threshold: 0.5,
            dietary_strict_mode: false,
            min_results: 3,
            max_results: 10,
            relax_step: 0.1,
            fallback_strategy: FallbackStrategy::RelaxThresholds,
            confidence_weights: ConfidenceWeights::default(),
        }
    }
}

impl JudgeConfig {
    /// Validate judge invariants.
    ///
    /// # Errors
    /// Returns `InvalidConfig` for thresholds outside [0, 1], a relax step
    /// outside (0, 1], zero `max_results`, `min_results` above
    /// `max_results`, or non-positive confidence weights.
    pub fn validate(&self) -> SearchResult<()> {
        for (name, value) in [
            ("semantic_threshold", self.semantic_threshold),
            ("filter_compliance_min", self.filter_compliance_min),
            ("ingredient_match_min", self.ingredient_match_min),
            ("confidence_threshold", self.confidence_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(SearchError::InvalidConfig(format!(
                    "judge.{name} must be within [0, 1], got {value}"
                )));
            }
        }
        if self.max_results == 0 {
            return Err(SearchError::InvalidConfig(
                "judge.max_results must be > 0".to_string(),
            ));
        }
        if self.min_results > self.max_results {
            return Err(SearchError::InvalidConfig(
                "judge.min_results must not exceed judge.max_results".to_string(),
            ));
        }
        if !(self.relax_step > 0.0 && self.relax_step <= 1.0) {
            return Err(SearchError::InvalidConfig(
                "judge.relax_step must be within (0, 1]".to_string(),
            ));
        }
        let weights = &self.confidence_weights;
        if weights.semantic < 0.0 || weights.filter < 0.0 || weights.ingredient < 0.0 {
            return Err(SearchError::InvalidConfig(
                "judge.confidence_weights must be non-negative".to_string(),
            ));
        }
        if weights.total() <= 0.0 {
            return Err(SearchError::InvalidConfig(
                "judge.confidence_weights must sum to a positive value".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_judge_config_is_valid() {
        assert!(JudgeConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_threshold_above_one() {
        let config = JudgeConfig {
            semantic_threshold: 1.5,
            ..JudgeConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_min_above_max() {
        let config = JudgeConfig {
            min_results: 20,
            max_results: 10,
            ..JudgeConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_relax_step() {
        let config = JudgeConfig {
            relax_step: 0.0,
            ..JudgeConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_weights() {
        let config = JudgeConfig {
            confidence_weights: ConfidenceWeights {
                semantic: 0.0,
                filter: 0.0,
                ingredient: 0.0,
            },
            ..JudgeConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
