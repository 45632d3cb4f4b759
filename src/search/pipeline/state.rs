//! Typed pipeline stages.
//!
//! Each stage owns exactly the data produced so far and is consumed by the
//! next transition, so no stage can read a field a later stage has not yet
//! populated.

use crate::search::core::ids::RequestId;
use crate::search::core::intent::ParsedIntent;
use crate::search::core::query::SearchQuery;
use crate::search::judge::relevance::JudgeReport;
use crate::search::retrieval::candidates::CandidateSet;
use crate::search::retrieval::fusion::MergedResult;

/// Stage 1: query validated and parsed into a structured intent.
#[derive(Clone, Debug)]
pub struct ParsedStage {
    /// Correlation id for this invocation.
    pub request_id: RequestId,
    /// Validated query.
    pub query: SearchQuery,
    /// Structured intent (possibly degraded).
    pub intent: ParsedIntent,
}

impl ParsedStage {
    /// Advance with retrieved branch candidates.
    #[must_use]
    pub fn retrieved(self, candidates: CandidateSet) -> RetrievedStage {
        RetrievedStage {
            request_id: self.request_id,
            query: self.query,
            intent: self.intent,
            candidates,
        }
    }
}

/// Stage 2: both retrieval branches completed (possibly one degraded).
#[derive(Clone, Debug)]
pub struct RetrievedStage {
    /// Correlation id for this invocation.
    pub request_id: RequestId,
    /// Validated query.
    pub query: SearchQuery,
    /// Structured intent.
    pub intent: ParsedIntent,
    /// Branch candidates.
    pub candidates: CandidateSet,
}

impl RetrievedStage {
    /// Advance with the fused ranking.
    #[must_use]
    pub fn fused(self, fused: Vec<MergedResult>) -> FusedStage {
        let partial = self.candidates.partial;
        FusedStage {
            request_id: self.request_id,
            query: self.query,
            intent: self.intent,
            partial,
            fused,
        }
    }
}

/// Stage 3: branch lists merged into one ranking.
#[derive(Clone, Debug)]
pub struct FusedStage {
    /// Correlation id for this invocation.
    pub request_id: RequestId,
    /// Validated query.
    pub query: SearchQuery,
    /// Structured intent.
    pub intent: ParsedIntent,
    /// Whether one retrieval branch failed.
    pub partial: bool,
    /// Fused candidates, best first.
    pub fused: Vec<MergedResult>,
}

impl FusedStage {
    /// Advance with the judge's verdict, or without one when reranking is
    /// disabled.
    #[must_use]
    pub fn judged(self, kept: Vec<MergedResult>, report: Option<JudgeReport>) -> JudgedStage {
        JudgedStage {
            request_id: self.request_id,
            query: self.query,
            intent: self.intent,
            partial: self.partial,
            kept,
            report,
        }
    }
}

/// Stage 4: final kept candidates, ready for response assembly.
#[derive(Clone, Debug)]
pub struct JudgedStage {
    /// Correlation id for this invocation.
    pub request_id: RequestId,
    /// Validated query.
    pub query: SearchQuery,
    /// Structured intent.
    pub intent: ParsedIntent,
    /// Whether one retrieval branch failed.
    pub partial: bool,
    /// Final kept candidates, best first.
    pub kept: Vec<MergedResult>,
    /// Judge report; absent when reranking was disabled.
    pub report: Option<JudgeReport>,
}
