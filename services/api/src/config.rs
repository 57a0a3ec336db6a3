//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

pub const DEFAULT_OAUTH_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const DEFAULT_DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";
pub const DEFAULT_DRIVE_UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";
pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Which generative model backs the summarizer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SummarizerProvider {
    Gemini,
    OpenAi,
}

/// Settings for the summarizer, loadable on their own for the `tune` binary.
#[derive(Clone, Debug)]
pub struct SummarizerConfig {
    pub provider: SummarizerProvider,
    pub model: String,
    pub gemini_api_key: Option<String>,
    pub gemini_api_base: String,
    pub openai_api_key: Option<String>,
}

/// OAuth client identity used to refresh offline-access tokens.
#[derive(Clone, Debug)]
pub struct OAuthClientConfig {
    pub client_id: String,
    pub client_secret: String,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub prompts_path: PathBuf,
    pub cors_origin: String,
    pub fernet_key: String,
    pub oauth_client: Option<OAuthClientConfig>,
    pub oauth_token_url: String,
    pub drive_api_base: String,
    pub drive_upload_base: String,
    pub archive_folder: String,
    pub extract_timeout: Duration,
    pub summarizer: SummarizerConfig,
}

fn load_dotenv() {
    // Only load from .env in non-test mode to avoid contamination.
    if !cfg!(test) {
        dotenvy::dotenv().ok();
    }
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl SummarizerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        load_dotenv();

        let provider_str = var_or("SUMMARIZER_PROVIDER", "gemini");
        let provider = match provider_str.to_lowercase().as_str() {
            "gemini" | "google" => SummarizerProvider::Gemini,
            "openai" => SummarizerProvider::OpenAi,
            _ => {
                return Err(ConfigError::InvalidValue(
                    "SUMMARIZER_PROVIDER".to_string(),
                    format!("'{}' is not one of gemini, openai", provider_str),
                ))
            }
        };

        let default_model = match provider {
            SummarizerProvider::Gemini => "gemini-2.5-flash",
            SummarizerProvider::OpenAi => "gpt-4o",
        };
        let model = var_or("SUMMARY_MODEL", default_model);

        let gemini_api_key = non_empty_var("GEMINI_API_KEY");
        let openai_api_key = non_empty_var("OPENAI_API_KEY");

        // The selected provider cannot run without its key.
        match provider {
            SummarizerProvider::Gemini if gemini_api_key.is_none() => {
                return Err(ConfigError::MissingVar("GEMINI_API_KEY".to_string()))
            }
            SummarizerProvider::OpenAi if openai_api_key.is_none() => {
                return Err(ConfigError::MissingVar("OPENAI_API_KEY".to_string()))
            }
            _ => {}
        }

        Ok(Self {
            provider,
            model,
            gemini_api_key,
            gemini_api_base: var_or("GEMINI_API_BASE", DEFAULT_GEMINI_API_BASE),
            openai_api_key,
        })
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        load_dotenv();

        // --- Load Server and Database Settings ---
        let bind_address_str = var_or("BIND_ADDRESS", "0.0.0.0:3000");
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = var_or("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let prompts_path = std::env::var("PROMPTS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./prompts"));

        let cors_origin = var_or("CORS_ORIGIN", "http://localhost:3000");

        // --- Load Credential Settings ---
        let fernet_key = non_empty_var("FERNET_KEY")
            .ok_or_else(|| ConfigError::MissingVar("FERNET_KEY".to_string()))?;

        let oauth_client = match (
            non_empty_var("GOOGLE_CLIENT_ID"),
            non_empty_var("GOOGLE_CLIENT_SECRET"),
        ) {
            (Some(client_id), Some(client_secret)) => Some(OAuthClientConfig {
                client_id,
                client_secret,
            }),
            _ => None,
        };

        // --- Load Adapter-specific Settings ---
        let oauth_token_url = var_or("OAUTH_TOKEN_URL", DEFAULT_OAUTH_TOKEN_URL);
        let drive_api_base = var_or("DRIVE_API_BASE", DEFAULT_DRIVE_API_BASE);
        let drive_upload_base = var_or("DRIVE_UPLOAD_BASE", DEFAULT_DRIVE_UPLOAD_BASE);
        let archive_folder = var_or(
            "ARCHIVE_FOLDER",
            idea_farm_core::domain::DEFAULT_ARCHIVE_FOLDER,
        );

        let timeout_str = var_or("EXTRACT_TIMEOUT_SECS", "10");
        let extract_timeout = timeout_str
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| {
                ConfigError::InvalidValue("EXTRACT_TIMEOUT_SECS".to_string(), e.to_string())
            })?;

        let summarizer = SummarizerConfig::from_env()?;

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            prompts_path,
            cors_origin,
            fernet_key,
            oauth_client,
            oauth_token_url,
            drive_api_base,
            drive_upload_base,
            archive_folder,
            extract_timeout,
            summarizer,
        })
    }
}
