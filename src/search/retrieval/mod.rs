//! Candidate retrieval: parallel semantic and filter branches plus rank
//! fusion of their results.

pub mod candidates;
pub mod fusion;
pub mod retriever;
pub mod stores;

pub use candidates::{
    AttributeHit, CandidateResult, CandidateSet, CandidateSource, DistanceMetric,
};
pub use fusion::{fuse, sort_merged, FusionConfig, MergedResult};
pub use retriever::CandidateRetriever;
pub use stores::{AttributeStore, StoreFuture, VectorStore};
