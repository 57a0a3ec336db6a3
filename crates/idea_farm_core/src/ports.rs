//! crates/idea_farm_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the pipeline's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{
    AccessCredential, AnalysisOutcome, Idea, IdeaAnalysisUpdate, UserSecret,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// Expected ways content extraction can come up empty.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractionFailure {
    #[error("invalid URL '{0}'")]
    InvalidUrl(String),
    #[error("no transcript available for video {0}")]
    NoTranscript(String),
    #[error("failed to fetch URL content: {0}")]
    Fetch(String),
    #[error("no text extracted from content")]
    Empty,
}

/// Result of exchanging an OAuth authorization code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeExchangeOutcome {
    /// A refresh token was returned, encrypted and stored.
    Stored,
    /// The provider did not return a refresh token; the user must re-consent.
    ConsentRequired,
    /// The provider rejected the code.
    Rejected(String),
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait IdeaRepository: Send + Sync {
    async fn create_idea(&self, idea: &Idea) -> PortResult<Idea>;

    async fn get_idea(&self, idea_id: Uuid) -> PortResult<Idea>;

    async fn delete_idea(&self, idea_id: Uuid) -> PortResult<Idea>;

    async fn mark_processing(&self, idea_id: Uuid) -> PortResult<()>;

    /// Stores the extracted text, overwriting any previous run's text.
    async fn save_extracted_text(&self, idea_id: Uuid, text: &str) -> PortResult<()>;

    async fn get_extracted_text(&self, idea_id: Uuid) -> PortResult<Option<String>>;

    /// Writes every derived field and the final status in one update.
    async fn complete_idea(&self, idea_id: Uuid, update: &IdeaAnalysisUpdate) -> PortResult<()>;

    async fn mark_failed(&self, idea_id: Uuid, error: &str) -> PortResult<()>;
}

#[async_trait]
pub trait SecretStore: Send + Sync {
    /// `Ok(None)` when the user never connected their archive.
    async fn get_user_secret(&self, user_id: Uuid) -> PortResult<Option<UserSecret>>;

    async fn put_user_secret(&self, user_id: Uuid, encrypted_refresh_token: &str)
        -> PortResult<()>;
}

#[async_trait]
pub trait ContentExtractor: Send + Sync {
    /// Turns a URL (web page or video) into plain text.
    async fn extract(&self, reference: &str) -> Result<String, ExtractionFailure>;
}

#[async_trait]
pub trait SummarizationService: Send + Sync {
    /// Produces a structured analysis. Failures are reported in the outcome, never raised.
    async fn summarize(&self, text: &str, prompt_template: Option<&str>) -> AnalysisOutcome;
}

#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// A refreshed credential for `user_id`, or `None` when offline access is unavailable.
    async fn get_credentials(&self, user_id: Uuid) -> Option<AccessCredential>;

    async fn exchange_code(
        &self,
        user_id: Uuid,
        code: &str,
        redirect_uri: &str,
    ) -> PortResult<CodeExchangeOutcome>;
}

#[async_trait]
pub trait ArchiveService: Send + Sync {
    /// Uploads a markdown document into `folder`, creating the folder at most once.
    async fn upload_markdown(
        &self,
        credential: &AccessCredential,
        filename: &str,
        content: &str,
        folder: &str,
    ) -> Option<String>;

    /// Best-effort removal of a previously uploaded document.
    async fn delete_file(&self, credential: &AccessCredential, file_id: &str) -> bool;
}
