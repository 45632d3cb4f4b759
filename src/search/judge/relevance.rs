//! Relevance judging of fused candidates, with fallback handling.
//!
//! The judge is a state machine over the fused candidate set:
//! `Fused -> Judged -> {Passed, Relaxed(n), Empty, Suggested}`. The
//! transition is decided in exactly one place (`resolve`) so fallback
//! behavior cannot drift between call sites. Too few survivors is never an
//! error, only a transition.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::search::core::ids::RecipeId;
use crate::search::core::intent::ParsedIntent;
use crate::search::judge::config::{FallbackStrategy, JudgeConfig};
use crate::search::judge::metrics::{FailReason, JudgeMetrics};
use crate::search::retrieval::fusion::{sort_merged, MergedResult};

/// Terminal state of the judge for one request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum JudgeOutcome {
    /// Enough candidates passed at the configured thresholds.
    Passed,
    /// Thresholds were stepped down `steps` times to reach quorum (or
    /// bottomed out at zero).
    Relaxed {
        /// Number of relaxation iterations applied.
        steps: usize,
    },
    /// The empty-results fallback fired.
    Empty,
    /// Numeric thresholds were bypassed and the fused top was returned as
    /// alternative suggestions.
    Suggested,
}

/// The numeric thresholds in effect for one filtering pass.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Minimum semantic similarity.
    pub semantic: f64,
    /// Minimum filter compliance.
    pub filter: f64,
    /// Minimum ingredient match.
    pub ingredient: f64,
    /// Minimum combined confidence.
    pub confidence: f64,
}

impl Thresholds {
    fn from_config(config: &JudgeConfig) -> Self {
        Self {
            semantic: config.semantic_threshold,
            filter: config.filter_compliance_min,
            ingredient: config.ingredient_match_min,
            confidence: config.confidence_threshold,
        }
    }

    /// Step every threshold down by `step`, clamped at zero.
    fn relax(&mut self, step: f64) {
        self.semantic = (self.semantic - step).max(0.0);
        self.filter = (self.filter - step).max(0.0);
        self.ingredient = (self.ingredient - step).max(0.0);
        self.confidence = (self.confidence - step).max(0.0);
    }

    fn all_zero(&self) -> bool {
        self.semantic == 0.0
            && self.filter == 0.0
            && self.ingredient == 0.0
            && self.confidence == 0.0
    }
}

/// Per-candidate judgement recorded in the report.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CandidateJudgement {
    /// Judged recipe.
    pub recipe_id: RecipeId,
    /// Scoring detail, with pass/fail evaluated at the final thresholds.
    pub metrics: JudgeMetrics,
}

/// Aggregate judgement for one request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JudgeReport {
    /// Which terminal state the judge reached.
    pub outcome: JudgeOutcome,
    /// Thresholds in effect when the final pass was evaluated.
    pub final_thresholds: Thresholds,
    /// Every fused candidate's metrics at the final thresholds.
    pub judgements: Vec<CandidateJudgement>,
}

impl JudgeReport {
    /// Metrics for a specific recipe, if it was judged.
    #[must_use]
    pub fn metrics_for(&self, recipe_id: RecipeId) -> Option<&JudgeMetrics> {
        self.judgements
            .iter()
            .find(|judgement| judgement.recipe_id == recipe_id)
            .map(|judgement| &judgement.metrics)
    }
}

/// Kept candidates plus the report describing how they were chosen.
#[derive(Clone, Debug)]
pub struct JudgeVerdict {
    /// Surviving candidates, best first, truncated to `max_results`.
    pub kept: Vec<MergedResult>,
    /// Per-candidate metrics and the fallback path taken.
    pub report: JudgeReport,
}

/// Transition selected by the state machine after the initial pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Transition {
    Accept,
    Relax,
    Empty,
    Suggest,
}

/// Threshold-based candidate filter with configurable fallback.
pub struct RelevanceJudge {
    config: JudgeConfig,
}

impl RelevanceJudge {
    /// Create a judge from validated configuration.
    #[must_use]
    pub const fn new(config: JudgeConfig) -> Self {
        Self { config }
    }

    /// Judge the fused candidate set for one request.
    ///
    /// Input order does not matter; the verdict is re-sorted by the fusion
    /// total order and truncated to `max_results`.
    #[must_use]
    pub fn judge(&self, fused: &[MergedResult], intent: &ParsedIntent) -> JudgeVerdict {
        let scored: Vec<(MergedResult, JudgeMetrics)> = fused
            .iter()
            .map(|candidate| {
                let metrics =
                    JudgeMetrics::score(candidate, intent, &self.config.confidence_weights);
                (candidate.clone(), metrics)
            })
            .collect();

        let original = Thresholds::from_config(&self.config);
        let kept = self.apply_pass(&scored, intent, original);

        match self.resolve(kept.len()) {
            Transition::Accept => {
                self.verdict(scored, intent, original, JudgeOutcome::Passed)
            }
            Transition::Relax => self.relax(scored, intent, original),
            Transition::Empty => JudgeVerdict {
                kept: Vec::new(),
                report: self.report(&scored, intent, original, JudgeOutcome::Empty),
            },
            Transition::Suggest => self.suggest(scored, intent, original),
        }
    }

    /// The transition table. Single source of truth for fallback behavior.
    fn resolve(&self, kept_count: usize) -> Transition {
        if kept_count >= self.config.min_results {
            return Transition::Accept;
        }
        match self.config.fallback_strategy {
            FallbackStrategy::RelaxThresholds => Transition::Relax,
            FallbackStrategy::EmptyResults => Transition::Empty,
            FallbackStrategy::SuggestAlternatives => Transition::Suggest,
        }
    }

    /// Iteratively relax thresholds over the original fused set until
    /// quorum is reached or every threshold bottoms out at zero.
    fn relax(
        &self,
        scored: Vec<(MergedResult, JudgeMetrics)>,
        intent: &ParsedIntent,
        original: Thresholds,
    ) -> JudgeVerdict {
        let mut thresholds = original;
        let mut steps = 0;
        loop {
            thresholds.relax(self.config.relax_step);
            steps += 1;
            let kept = self.apply_pass(&scored, intent, thresholds);
            if kept.len() >= self.config.min_results || thresholds.all_zero() {
                debug!(steps, kept = kept.len(), "relaxed judge thresholds");
                return self.verdict(scored, intent, thresholds, JudgeOutcome::Relaxed { steps });
            }
        }
    }

    /// Bypass numeric thresholds; dietary strictness still applies.
    fn suggest(
        &self,
        scored: Vec<(MergedResult, JudgeMetrics)>,
        intent: &ParsedIntent,
        original: Thresholds,
    ) -> JudgeVerdict {
        let ignore_all = Thresholds {
            semantic: 0.0,
            filter: 0.0,
            ingredient: 0.0,
            confidence: 0.0,
        };
        let mut kept = self.apply_pass(&scored, intent, ignore_all);
        sort_merged(&mut kept);
        kept.truncate(self.config.max_results);
        JudgeVerdict {
            kept,
            report: self.report(&scored, intent, original, JudgeOutcome::Suggested),
        }
    }

    fn verdict(
        &self,
        scored: Vec<(MergedResult, JudgeMetrics)>,
        intent: &ParsedIntent,
        thresholds: Thresholds,
        outcome: JudgeOutcome,
    ) -> JudgeVerdict {
        let mut kept = self.apply_pass(&scored, intent, thresholds);
        sort_merged(&mut kept);
        kept.truncate(self.config.max_results);
        JudgeVerdict {
            kept,
            report: self.report(&scored, intent, thresholds, outcome),
        }
    }

    fn report(
        &self,
        scored: &[(MergedResult, JudgeMetrics)],
        intent: &ParsedIntent,
        thresholds: Thresholds,
        outcome: JudgeOutcome,
    ) -> JudgeReport {
        let judgements = scored
            .iter()
            .map(|(candidate, metrics)| {
                let mut metrics = metrics.clone();
                let reasons = self.check(candidate, &metrics, intent, thresholds);
                metrics.passed = reasons.is_empty();
                metrics.fail_reasons = reasons;
                CandidateJudgement {
                    recipe_id: candidate.recipe_id,
                    metrics,
                }
            })
            .collect();
        JudgeReport {
            outcome,
            final_thresholds: thresholds,
            judgements,
        }
    }

    /// One filtering pass at the given thresholds.
    fn apply_pass(
        &self,
        scored: &[(MergedResult, JudgeMetrics)],
        intent: &ParsedIntent,
        thresholds: Thresholds,
    ) -> Vec<MergedResult> {
        scored
            .iter()
            .filter(|(candidate, metrics)| {
                self.check(candidate, metrics, intent, thresholds).is_empty()
            })
            .map(|(candidate, _)| candidate.clone())
            .collect()
    }

    /// Evaluate the filtering rule, returning every violated condition.
    fn check(
        &self,
        candidate: &MergedResult,
        metrics: &JudgeMetrics,
        intent: &ParsedIntent,
        thresholds: Thresholds,
    ) -> Vec<FailReason> {
        let mut reasons = Vec::new();

        // A semantic-only miss is waived for candidates the filter branch
        // matched perfectly; otherwise an absent similarity scores 0.0 and
        // fails any positive threshold.
        let semantic_waived =
            candidate.semantic_rank.is_none() && metrics.filter_compliance >= 1.0;
        if !semantic_waived && metrics.semantic_similarity < thresholds.semantic {
            reasons.push(FailReason::SemanticBelowThreshold);
        }
        if metrics.filter_compliance < thresholds.filter {
            reasons.push(FailReason::FilterComplianceBelow);
        }
        if metrics.ingredient_match < thresholds.ingredient {
            reasons.push(FailReason::IngredientMatchBelow);
        }
        if metrics.confidence < thresholds.confidence {
            reasons.push(FailReason::ConfidenceBelow);
        }

        // Strict diet mode is never relaxed. Unverifiable compliance
        // (semantic-only candidate) counts as a violation.
        if self.config.dietary_strict_mode && !intent.diet_types().is_empty() {
            match candidate.diet_compliant {
                Some(true) => {}
                Some(false) | None => reasons.push(FailReason::DietaryViolation),
            }
        }

        reasons
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::core::filters::{DietType, FilterSet, RecipeFilter};
    use uuid::Uuid;

    fn rid(n: u128) -> RecipeId {
        RecipeId::from_uuid(Uuid::from_u128(n))
    }

    fn candidate(n: u128, semantic: f64, filter: Option<f64>) -> MergedResult {
        MergedResult {
            recipe_id: rid(n),
            fused_score: 1.0 / (60.0 + n as f64),
            semantic_rank: Some(n as usize),
            filter_rank: filter.map(|_| n as usize),
            semantic_score: Some(semantic),
            filter_score: filter,
            ingredient_ratio: None,
            diet_compliant: filter.map(|_| true),
        }
    }

    fn plain_intent() -> ParsedIntent {
        ParsedIntent::new("hearty stew".to_string(), FilterSet::new())
    }

    fn judge_with(config: JudgeConfig) -> RelevanceJudge {
        config.validate().expect("valid config");
        RelevanceJudge::new(config)
    }

    #[test]
    fn test_all_pass_at_original_thresholds() {
        let judge = judge_with(JudgeConfig {
            min_results: 1,
            ..JudgeConfig::default()
        });
        let fused = vec![candidate(1, 0.9, None), candidate(2, 0.8, None)];
        let verdict = judge.judge(&fused, &plain_intent());
        assert_eq!(verdict.report.outcome, JudgeOutcome::Passed);
        assert_eq!(verdict.kept.len(), 2);
    }

    #[test]
    fn test_relaxation_reaches_quorum() {
        // Five candidates, one passes at 0.9; relaxation must step down
        // until at least three are kept.
        let judge = judge_with(JudgeConfig {
            semantic_threshold: 0.9,
            confidence_threshold: 0.0,
            filter_compliance_min: 0.0,
            ingredient_match_min: 0.0,
            min_results: 3,
            fallback_strategy: FallbackStrategy::RelaxThresholds,
            ..JudgeConfig::default()
        });
        let fused = vec![
            candidate(1, 0.95, None),
            candidate(2, 0.75, None),
            candidate(3, 0.72, None),
            candidate(4, 0.40, None),
            candidate(5, 0.10, None),
        ];
        let verdict = judge.judge(&fused, &plain_intent());
        assert!(verdict.kept.len() >= 3);
        match verdict.report.outcome {
            JudgeOutcome::Relaxed { steps } => assert_eq!(steps, 2),
            other => panic!("expected relaxed outcome, got {other:?}"),
        }
        // 0.9 - 2 * 0.1 = 0.7 keeps exactly the top three.
        assert_eq!(verdict.kept.len(), 3);
    }

    #[test]
    fn test_relaxation_bottoms_out_at_zero() {
        let judge = judge_with(JudgeConfig {
            semantic_threshold: 1.0,
            confidence_threshold: 1.0,
            filter_compliance_min: 1.0,
            ingredient_match_min: 1.0,
            min_results: 3,
            relax_step: 0.5,
            fallback_strategy: FallbackStrategy::RelaxThresholds,
            ..JudgeConfig::default()
        });
        let fused = vec![candidate(1, 0.2, None)];
        let verdict = judge.judge(&fused, &plain_intent());
        // Quorum is unreachable with one candidate; thresholds hit zero
        // after two steps and whatever passes at zero is kept.
        match verdict.report.outcome {
            JudgeOutcome::Relaxed { steps } => assert_eq!(steps, 2),
            other => panic!("expected relaxed outcome, got {other:?}"),
        }
        assert_eq!(verdict.kept.len(), 1);
        assert!(verdict.report.final_thresholds.all_zero());
    }

    #[test]
    fn test_empty_results_fallback_returns_nothing() {
        let judge = judge_with(JudgeConfig {
            semantic_threshold: 0.99,
            min_results: 3,
            fallback_strategy: FallbackStrategy::EmptyResults,
            ..JudgeConfig::default()
        });
        let fused = vec![candidate(1, 0.5, None), candidate(2, 0.4, None)];
        let verdict = judge.judge(&fused, &plain_intent());
        assert_eq!(verdict.report.outcome, JudgeOutcome::Empty);
        assert!(verdict.kept.is_empty());
        // Metrics are still reported for every fused candidate.
        assert_eq!(verdict.report.judgements.len(), 2);
    }

    #[test]
    fn test_suggest_alternatives_ignores_numeric_thresholds() {
        let judge = judge_with(JudgeConfig {
            semantic_threshold: 0.99,
            confidence_threshold: 0.99,
            min_results: 2,
            max_results: 2,
            fallback_strategy: FallbackStrategy::SuggestAlternatives,
            ..JudgeConfig::default()
        });
        let fused = vec![
            candidate(1, 0.1, None),
            candidate(2, 0.1, None),
            candidate(3, 0.1, None),
        ];
        let verdict = judge.judge(&fused, &plain_intent());
        assert_eq!(verdict.report.outcome, JudgeOutcome::Suggested);
        assert_eq!(verdict.kept.len(), 2);
    }

    #[test]
    fn test_suggest_alternatives_still_enforces_strict_diet() {
        let judge = judge_with(JudgeConfig {
            semantic_threshold: 0.99,
            dietary_strict_mode: true,
            min_results: 2,
            fallback_strategy: FallbackStrategy::SuggestAlternatives,
            ..JudgeConfig::default()
        });
        let intent = ParsedIntent::new(
            "vegan bowl".to_string(),
            FilterSet::from_filters(vec![RecipeFilter::Diet(DietType::Vegan)]),
        );
        let mut compliant = candidate(1, 0.1, Some(1.0));
        compliant.diet_compliant = Some(true);
        let mut violating = candidate(2, 0.1, Some(1.0));
        violating.diet_compliant = Some(false);
        // Semantic-only: compliance unverifiable, rejected under strict mode.
        let unverified = candidate(3, 0.1, None);

        let verdict = judge.judge(&[compliant, violating, unverified], &intent);
        assert_eq!(verdict.kept.len(), 1);
        assert_eq!(verdict.kept[0].recipe_id, rid(1));
    }

    #[test]
    fn test_semantic_waiver_for_perfect_filter_match() {
        let judge = judge_with(JudgeConfig {
            semantic_threshold: 0.8,
            confidence_threshold: 0.0,
            min_results: 1,
            ..JudgeConfig::default()
        });
        let intent = ParsedIntent::new(
            "italian".to_string(),
            FilterSet::from_filters(vec![RecipeFilter::Cuisine("italian".to_string())]),
        );
        // Filter-only candidate with full compliance: semantic check waived.
        let mut filter_only = candidate(1, 0.0, Some(1.0));
        filter_only.semantic_rank = None;
        filter_only.semantic_score = None;

        let verdict = judge.judge(&[filter_only], &intent);
        assert_eq!(verdict.report.outcome, JudgeOutcome::Passed);
        assert_eq!(verdict.kept.len(), 1);
    }

    #[test]
    fn test_l2_similarity_keeps_close_match_and_drops_distant() {
        use crate::search::retrieval::candidates::DistanceMetric;

        let judge = judge_with(JudgeConfig {
            confidence_threshold: 0.0,
            min_results: 1,
            fallback_strategy: FallbackStrategy::EmptyResults,
            ..JudgeConfig::default()
        });
        // Default semantic threshold 0.6: a self-match (distance 0) must
        // pass it and a distant candidate must not, regardless of metric.
        let close = candidate(1, DistanceMetric::L2.raw_score(0.0), None);
        let distant = candidate(2, DistanceMetric::L2.raw_score(9.0), None);
        let verdict = judge.judge(&[close, distant], &plain_intent());
        assert_eq!(verdict.report.outcome, JudgeOutcome::Passed);
        assert_eq!(verdict.kept.len(), 1);
        assert_eq!(verdict.kept[0].recipe_id, rid(1));
    }

    #[test]
    fn test_fail_reasons_are_recorded() {
        let judge = judge_with(JudgeConfig {
            semantic_threshold: 0.9,
            confidence_threshold: 0.9,
            min_results: 1,
            fallback_strategy: FallbackStrategy::EmptyResults,
            ..JudgeConfig::default()
        });
        let fused = vec![candidate(1, 0.2, None)];
        let verdict = judge.judge(&fused, &plain_intent());
        let metrics = verdict.report.metrics_for(rid(1)).expect("judged");
        assert!(!metrics.passed);
        assert!(metrics
            .fail_reasons
            .contains(&FailReason::SemanticBelowThreshold));
        assert!(metrics.fail_reasons.contains(&FailReason::ConfidenceBelow));
    }

    #[test]
    fn test_kept_list_truncated_to_max_results() {
        let judge = judge_with(JudgeConfig {
            semantic_threshold: 0.0,
            confidence_threshold: 0.0,
            filter_compliance_min: 0.0,
            ingredient_match_min: 0.0,
            min_results: 1,
            max_results: 2,
            ..JudgeConfig::default()
        });
        let fused = vec![
            candidate(1, 0.9, None),
            candidate(2, 0.8, None),
            candidate(3, 0.7, None),
        ];
        let verdict = judge.judge(&fused, &plain_intent());
        assert_eq!(verdict.kept.len(), 2);
    }
}
