//! Pipeline orchestration: typed stages, response assembly, and the
//! end-to-end search orchestrator.

pub mod orchestrator;
pub mod response;
pub mod state;

pub use orchestrator::{SearchBackends, SearchOrchestrator};
pub use response::{MatchType, RecipeHit, SearchMetadata, SearchResponse, SearchType};
pub use state::{FusedStage, JudgedStage, ParsedStage, RetrievedStage};
