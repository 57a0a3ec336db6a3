pub mod credentials;
pub mod db;
pub mod drive;
pub mod extraction;
pub mod gemini;
pub mod oauth;
pub mod openai_summary;
pub mod token_cipher;

pub use credentials::GoogleCredentialAdapter;
pub use db::DbAdapter;
pub use drive::DriveArchiveAdapter;
pub use extraction::UrlContentExtractor;
pub use gemini::GeminiSummarizer;
pub use oauth::OAuthClient;
pub use openai_summary::OpenAiSummarizer;
pub use token_cipher::TokenCipher;

use crate::{
    config::{SummarizerConfig, SummarizerProvider},
    error::ApiError,
};
use async_openai::{config::OpenAIConfig, Client};
use idea_farm_core::ports::SummarizationService;
use std::sync::Arc;

/// Builds the summarizer selected by `SUMMARIZER_PROVIDER`.
pub fn summarizer_from_config(
    config: &SummarizerConfig,
) -> Result<Arc<dyn SummarizationService>, ApiError> {
    match config.provider {
        SummarizerProvider::Gemini => {
            let api_key = config
                .gemini_api_key
                .clone()
                .ok_or_else(|| ApiError::Internal("GEMINI_API_KEY is required".to_string()))?;
            Ok(Arc::new(GeminiSummarizer::new(
                config.gemini_api_base.clone(),
                api_key,
                config.model.clone(),
            )?))
        }
        SummarizerProvider::OpenAi => {
            let api_key = config
                .openai_api_key
                .as_ref()
                .ok_or_else(|| ApiError::Internal("OPENAI_API_KEY is required".to_string()))?;
            let client = Client::with_config(OpenAIConfig::new().with_api_key(api_key));
            Ok(Arc::new(OpenAiSummarizer::new(client, config.model.clone())))
        }
    }
}
