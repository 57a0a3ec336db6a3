//! services/api/src/adapters/gemini.rs
//!
//! This module contains the summarizer adapter for Google Gemini (`generateContent`).
//! It implements the `SummarizationService` port from the `core` crate.

use async_trait::async_trait;
use idea_farm_core::{
    analysis::{build_prompt, parse_analysis, DEFAULT_PROMPT_TEMPLATE},
    domain::{AnalysisFailureKind, AnalysisOutcome},
    ports::SummarizationService,
};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{error, info};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Harm categories filtered at the highest threshold only.
const SAFETY_CATEGORIES: &[&str] = &[
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_HARASSMENT",
];

const BLOCKED_FINISH_REASONS: &[&str] = &["SAFETY", "BLOCKLIST", "PROHIBITED_CONTENT", "SPII"];

/// Sampling settings sent with every request.
#[derive(Clone, Copy, Debug)]
pub struct GenerationSettings {
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub top_p: f32,
    pub top_k: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            max_output_tokens: 8192,
            top_p: 0.8,
            top_k: 40,
        }
    }
}

//=========================================================================================
// Response Shapes
//=========================================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `SummarizationService` with Gemini and Google Search grounding.
pub struct GeminiSummarizer {
    http: reqwest::Client,
    api_base: String,
    api_key: SecretString,
    model: String,
    settings: GenerationSettings,
}

impl GeminiSummarizer {
    pub fn new(api_base: String, api_key: String, model: String) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        info!(model = %model, "Gemini summarizer initialized");
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model,
            settings: GenerationSettings::default(),
        })
    }

    fn request_body(&self, prompt: &str) -> Value {
        let safety_settings: Vec<Value> = SAFETY_CATEGORIES
            .iter()
            .map(|category| json!({ "category": category, "threshold": "BLOCK_ONLY_HIGH" }))
            .collect();
        json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "tools": [{ "googleSearch": {} }],
            "safetySettings": safety_settings,
            "generationConfig": {
                "temperature": self.settings.temperature,
                "maxOutputTokens": self.settings.max_output_tokens,
                "topP": self.settings.top_p,
                "topK": self.settings.top_k,
            },
        })
    }

    async fn call(&self, prompt: &str) -> Result<GenerateContentResponse, String> {
        let url = format!("{}/models/{}:generateContent", self.api_base, self.model);
        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|e| format!("Gemini request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(300).collect();
            return Err(format!("Gemini call failed with status {}: {}", status, snippet));
        }
        response
            .json()
            .await
            .map_err(|e| format!("Gemini response could not be decoded: {}", e))
    }
}

/// Turns a decoded Gemini response into an analysis outcome.
fn outcome_from_response(response: GenerateContentResponse) -> AnalysisOutcome {
    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return AnalysisOutcome::failed(
            AnalysisFailureKind::Blocked,
            format!("Prompt blocked by safety filters: {}", reason),
        );
    }

    let Some(candidate) = response.candidates.into_iter().next() else {
        return AnalysisOutcome::failed(AnalysisFailureKind::Malformed, "Model returned no candidates");
    };

    if let Some(reason) = candidate
        .finish_reason
        .as_deref()
        .filter(|r| BLOCKED_FINISH_REASONS.contains(r))
    {
        return AnalysisOutcome::failed(
            AnalysisFailureKind::Blocked,
            format!("Response blocked by safety filters: {}", reason),
        );
    }

    let text: String = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter(|part| !part.thought)
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return AnalysisOutcome::failed(AnalysisFailureKind::Malformed, "Model returned no text");
    }
    parse_analysis(&text)
}

//=========================================================================================
// `SummarizationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl SummarizationService for GeminiSummarizer {
    async fn summarize(&self, text: &str, prompt_template: Option<&str>) -> AnalysisOutcome {
        if text.trim().is_empty() {
            return AnalysisOutcome::failed(AnalysisFailureKind::Malformed, "No content to summarize");
        }
        let template = prompt_template.unwrap_or(DEFAULT_PROMPT_TEMPLATE);
        let prompt = build_prompt(template, text);

        match self.call(&prompt).await {
            Ok(response) => {
                let outcome = outcome_from_response(response);
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
