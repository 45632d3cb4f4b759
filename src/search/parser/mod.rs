//! Query understanding: LLM-assisted extraction of structured intent.

pub mod llm_parser;

pub use llm_parser::{GenFuture, LlmQueryParser, OllamaTextGenProvider, TextGenProvider};
