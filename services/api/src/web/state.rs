//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use idea_farm_core::{
    domain::DEFAULT_ARCHIVE_FOLDER,
    ports::{
        ArchiveService, ContentExtractor, CredentialProvider, IdeaRepository,
        SummarizationService,
    },
};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests and Pipeline Runs)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers
/// and to every spawned pipeline task.
#[derive(Clone)]
pub struct AppState {
    pub ideas: Arc<dyn IdeaRepository>,
    pub extractor: Arc<dyn ContentExtractor>,
    pub summarizer: Arc<dyn SummarizationService>,
    pub credentials: Arc<dyn CredentialProvider>,
    pub archive: Arc<dyn ArchiveService>,
    /// Drive folder that receives archived analyses.
    pub archive_folder: String,
    /// Template loaded from the prompts directory, if one was present at startup.
    pub prompt_template: Option<String>,
}

impl AppState {
    pub fn new(
        ideas: Arc<dyn IdeaRepository>,
        extractor: Arc<dyn ContentExtractor>,
        summarizer: Arc<dyn SummarizationService>,
        credentials: Arc<dyn CredentialProvider>,
        archive: Arc<dyn ArchiveService>,
    ) -> Self {
        Self {
            ideas,
            extractor,
            summarizer,
            credentials,
            archive,
            archive_folder: DEFAULT_ARCHIVE_FOLDER.to_string(),
            prompt_template: None,
        }
    }

    pub fn with_archive_folder(mut self, folder: impl Into<String>) -> Self {
        self.archive_folder = folder.into();
        self
    }

    pub fn with_prompt_template(mut self, template: Option<String>) -> Self {
        self.prompt_template = template;
        self
    }
}
