//! services/api/src/adapters/openai_summary.rs
//!
//! This module contains the summarizer adapter for OpenAI's Responses API.
//! It implements the `SummarizationService` port from the `core` crate.
//!
//! The Responses API has no per-category safety thresholds, so only grounding and
//! sampling settings are sent.

const SYSTEM_INSTRUCTIONS: &str = "You analyze captured content for a personal knowledge base. \
Use the web search tool to find related resources that exist today. \
Reply with a single JSON object and nothing else.";

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::responses::{CreateResponseArgs, Tool, WebSearchTool},
    Client,
};
use async_trait::async_trait;
use idea_farm_core::{
    analysis::{build_prompt, parse_analysis, DEFAULT_PROMPT_TEMPLATE},
    domain::{AnalysisFailureKind, AnalysisOutcome},
    ports::SummarizationService,
};
use tracing::error;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `SummarizationService` using an OpenAI model with web search.
#[derive(Clone)]
pub struct OpenAiSummarizer {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiSummarizer {
    /// Creates a new `OpenAiSummarizer`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }

    async fn call(&self, prompt: String) -> Result<String, String> {
        let request = CreateResponseArgs::default()
            .model(&self.model)
            .instructions(SYSTEM_INSTRUCTIONS)
            .input(prompt)
            .tools(vec![Tool::WebSearch(WebSearchTool::default())])
            .temperature(0.2)
            .top_p(0.8)
            .max_output_tokens(8192u32)
            .build()
            .map_err(|e| e.to_string())?;

        let response = self
            .client
            .responses()
            .create(request)
            .await
            .map_err(|e: OpenAIError| e.to_string())?;

        Ok(response.output_text().unwrap_or_default())
    }
}

//=========================================================================================
// `SummarizationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl SummarizationService for OpenAiSummarizer {
    async fn summarize(&self, text: &str, prompt_template: Option<&str>) -> AnalysisOutcome {
        if text.trim().is_empty() {
            return AnalysisOutcome::failed(AnalysisFailureKind::Malformed, "No content to summarize");
        }
        let template = prompt_template.unwrap_or(DEFAULT_PROMPT_TEMPLATE);

        match self.call(build_prompt(template, text)).await {
            Ok(raw) => {
                let outcome = parse_analysis(&raw);
                if let Some(error) = outcome.error() {
                    error!(model = %self.model, "Summarization failed: {}", error);
                }
                outcome
            }
            Err(message) => {
                error!(model = %self.model, "Summarization critical failure: {}", message);
                AnalysisOutcome::failed(AnalysisFailureKind::Call, message)
            }
        }
    }
}
