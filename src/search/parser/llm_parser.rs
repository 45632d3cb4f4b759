//! LLM-assisted query understanding with graceful degradation.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use regex::Regex;
use reqwest::Client as ReqwestClient;
use rig::client::CompletionClient;
use rig::completion::CompletionModel;
use rig::message::AssistantContent;
use rig::providers::ollama;
use serde::Deserialize;
use tracing::debug;

use crate::search::cache::keys::normalize_text;
use crate::search::core::config::LlmConfig;
use crate::search::core::errors::{SearchError, SearchResult};
use crate::search::core::filters::{DietType, Difficulty, FilterSet, RecipeFilter};
use crate::search::core::intent::ParsedIntent;

/// Boxed future type for text generation.
pub type GenFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Trait abstraction over text-generation providers.
pub trait TextGenProvider: Send + Sync {
    /// Generate a completion for a prompt.
    ///
    /// # Errors
    /// Returns an error if the completion request fails.
    fn generate(
        &self,
        prompt: &str,
        max_tokens: u64,
        temperature: f64,
    ) -> GenFuture<'_, SearchResult<String>>;
}

/// Ollama text-generation provider using Rig.
pub struct OllamaTextGenProvider {
    model: ollama::CompletionModel,
}

impl OllamaTextGenProvider {
    /// Create a new provider from the completion model config.
    ///
    /// # Errors
    /// Returns an error if the Ollama client cannot be built.
    pub fn new(config: &LlmConfig) -> SearchResult<Self> {
        let builder = ollama::Client::<ReqwestClient>::builder().api_key(rig::client::Nothing);
        let builder = if let Some(base_url) = &config.base_url {
            builder.base_url(base_url)
        } else {
            builder
        };
        let client = builder.build().map_err(SearchError::from)?;
        let model = client.completion_model(config.model.clone());
        Ok(Self { model })
    }
}

impl TextGenProvider for OllamaTextGenProvider {
    fn generate(
        &self,
        prompt: &str,
        max_tokens: u64,
        temperature: f64,
    ) -> GenFuture<'_, SearchResult<String>> {
        let prompt = prompt.to_string();
        Box::pin(async move {
            let request = self
                .model
                .completion_request(prompt)
                .temperature(temperature)
                .max_tokens(max_tokens)
                .build();
            let response = self.model.completion(request).await?;
            Ok(extract_text(&response.choice))
        })
    }
}

fn extract_text(choice: &rig::OneOrMany<AssistantContent>) -> String {
    let mut out = String::new();
    for content in choice.iter() {
        if let AssistantContent::Text(text) = content {
            out.push_str(&text.text);
        }
    }
    out
}

/// Raw extraction output before filter validation.
#[derive(Debug, Deserialize)]
struct IntentCandidate {
    semantic_query: Option<String>,
    cuisine: Option<String>,
    diet: Option<Vec<String>>,
    max_total_time_minutes: Option<u32>,
    difficulty: Option<String>,
    ingredients: Option<Vec<String>>,
}

/// Query parser backed by a text-generation provider.
///
/// Parsing never fails the pipeline: provider errors and malformed output
/// degrade to an intent carrying the raw query text and only the caller's
/// filters, so downstream stages always receive a usable `ParsedIntent`.
pub struct LlmQueryParser {
    provider: Arc<dyn TextGenProvider>,
    max_tokens: u64,
    json_block: Regex,
}

impl LlmQueryParser {
    const EXTRACTION_PROMPT: &'static str = "You extract recipe-search intent. \
Return strict JSON with fields: semantic_query (string), cuisine (string or null), \
diet (array of strings from: vegetarian, vegan, gluten_free, dairy_free, keto, paleo), \
max_total_time_minutes (integer or null), difficulty (easy|medium|hard or null), \
ingredients (array of strings). No prose, JSON only.\n\nQuery:\n";

    /// Create a new parser.
    ///
    /// # Errors
    /// Returns an error if the internal JSON extraction pattern is invalid.
    pub fn new(provider: Arc<dyn TextGenProvider>, config: &LlmConfig) -> SearchResult<Self> {
        let json_block = Regex::new(r"(?s)\{.*\}")
            .map_err(|err| SearchError::InvalidConfig(err.to_string()))?;
        Ok(Self {
            provider,
            max_tokens: config.max_tokens,
            json_block,
        })
    }

    /// Parse a raw query into a structured intent. Infallible by contract.
    pub async fn parse(&self, raw_query: &str, caller_filters: &FilterSet) -> ParsedIntent {
        let prompt = format!("{}{raw_query}", Self::EXTRACTION_PROMPT);

        let output = match self.provider.generate(&prompt, self.max_tokens, 0.0).await {
            Ok(output) => output,
            Err(err) => {
                debug!(error = %err, "query extraction failed, degrading to raw query");
                return ParsedIntent::degraded(raw_query, caller_filters.clone());
            }
        };

        match self.build_intent(raw_query, &output, caller_filters) {
            Ok(intent) => intent,
            Err(err) => {
                debug!(error = %err, "query extraction output malformed, degrading to raw query");
                ParsedIntent::degraded(raw_query, caller_filters.clone())
            }
        }
    }

    fn build_intent(
        &self,
        raw_query: &str,
        output: &str,
        caller_filters: &FilterSet,
    ) -> SearchResult<ParsedIntent> {
        // Models occasionally wrap the object in fences or prose.
        let json = self
            .json_block
            .find(output)
            .map_or(output, |m| m.as_str());
        let candidate: IntentCandidate = serde_json::from_str(json)?;

        let mut filters = FilterSet::new();
        if let Some(cuisine) = candidate.cuisine {
            if !cuisine.trim().is_empty() {
                filters.insert(RecipeFilter::Cuisine(cuisine));
            }
        }
        for diet in candidate.diet.unwrap_or_default() {
            filters.insert(RecipeFilter::Diet(DietType::parse(&diet)?));
        }
        if let Some(minutes) = candidate.max_total_time_minutes {
            filters.insert(RecipeFilter::MaxTotalTimeMinutes(minutes));
        }
        if let Some(difficulty) = candidate.difficulty {
            filters.insert(RecipeFilter::Difficulty(Difficulty::parse(&difficulty)?));
        }
        for ingredient in candidate.ingredients.unwrap_or_default() {
            if !ingredient.trim().is_empty() {
                filters.insert(RecipeFilter::Ingredient(ingredient));
            }
        }
        filters.merge(caller_filters);

        let semantic_query = candidate
            .semantic_query
            .map(|q| normalize_text(&q))
            .filter(|q| !q.is_empty())
            .unwrap_or_else(|| raw_query.trim().to_string());

        Ok(ParsedIntent::new(semantic_query, filters))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedProvider {
        output: SearchResult<String>,
    }

    impl TextGenProvider for FixedProvider {
        fn generate(
            &self,
            _prompt: &str,
            _max_tokens: u64,
            _temperature: f64,
        ) -> GenFuture<'_, SearchResult<String>> {
            let output = match &self.output {
                Ok(text) => Ok(text.clone()),
                Err(_) => Err(SearchError::ProviderTransient("down".to_string())),
            };
            Box::pin(async move { output })
        }
    }

    fn parser(output: SearchResult<String>) -> LlmQueryParser {
        LlmQueryParser::new(
            Arc::new(FixedProvider { output }),
            &LlmConfig::default(),
        )
        .expect("parser")
    }

    #[tokio::test]
    async fn test_parses_well_formed_extraction() {
        let parser = parser(Ok(r#"{
            "semantic_query": "quick weeknight curry",
            "cuisine": "thai",
            "diet": ["vegan"],
            "max_total_time_minutes": 30,
            "difficulty": "easy",
            "ingredients": ["coconut milk", "tofu"]
        }"#
            .to_string()));

        let intent = parser
            .parse("vegan thai curry under 30 min", &FilterSet::new())
            .await;
        assert!(!intent.degraded);
        assert_eq!(intent.semantic_query, "quick weeknight curry");
        assert_eq!(intent.filters.len(), 6);
        assert_eq!(intent.diet_types(), vec![DietType::Vegan]);
        assert!(intent.has_ingredient_query());
    }

    #[tokio::test]
    async fn test_provider_failure_degrades() {
        let caller = FilterSet::from_filters(vec![RecipeFilter::Cuisine("thai".to_string())]);
        let parser = parser(Err(SearchError::ProviderTransient("down".to_string())));
        let intent = parser.parse("thai curry", &caller).await;
        assert!(intent.degraded);
        assert_eq!(intent.semantic_query, "thai curry");
        assert_eq!(intent.filters, caller);
    }

    #[tokio::test]
    async fn test_malformed_output_degrades() {
        let parser = parser(Ok("sorry, I can't".to_string()));
        let intent = parser.parse("pasta", &FilterSet::new()).await;
        assert!(intent.degraded);
        assert_eq!(intent.semantic_query, "pasta");
    }

    #[tokio::test]
    async fn test_fenced_json_is_accepted() {
        let parser = parser(Ok(
            "```json\n{\"semantic_query\": \"lentil soup\", \"ingredients\": []}\n```".to_string(),
        ));
        let intent = parser.parse("lentil soup recipe", &FilterSet::new()).await;
        assert!(!intent.degraded);
        assert_eq!(intent.semantic_query, "lentil soup");
    }

    #[tokio::test]
    async fn test_empty_semantic_query_falls_back_to_raw() {
        let parser = parser(Ok("{\"semantic_query\": \"  \"}".to_string()));
        let intent = parser.parse("shakshuka", &FilterSet::new()).await;
        assert!(!intent.degraded);
        assert_eq!(intent.semantic_query, "shakshuka");
    }
}
