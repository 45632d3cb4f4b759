//! Relevance judging: threshold filtering of fused candidates plus the
//! fallback state machine for under-filled result sets.

pub mod config;
pub mod metrics;
pub mod relevance;

pub use config::{ConfidenceWeights, FallbackStrategy, JudgeConfig};
pub use metrics::{FailReason, JudgeMetrics};
pub use relevance::{
    CandidateJudgement, JudgeOutcome, JudgeReport, JudgeVerdict, RelevanceJudge, Thresholds,
};
