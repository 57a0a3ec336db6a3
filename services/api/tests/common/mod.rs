// Common test utilities: in-memory port implementations and a state builder.
#![allow(dead_code)]

use api_lib::web::state::AppState;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use idea_farm_core::{
    analysis::parse_analysis,
    domain::{
        AccessCredential, AnalysisOutcome, Idea, IdeaAnalysisUpdate, IdeaStatus,
        SuggestedLink, UserSecret,
    },
    ports::{
        ArchiveService, CodeExchangeOutcome, ContentExtractor, CredentialProvider,
        ExtractionFailure, IdeaRepository, PortError, PortResult, SecretStore,
        SummarizationService,
    },
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tokio::sync::Mutex;
use uuid::Uuid;

// =============================================================================
// Idea repository
// =============================================================================

#[derive(Default)]
pub struct InMemoryIdeas {
    pub ideas: Mutex<HashMap<Uuid, Idea>>,
    pub contents: Mutex<HashMap<Uuid, String>>,
    /// Every status the repository was asked to write, in order.
    pub status_log: Mutex<Vec<IdeaStatus>>,
}

impl InMemoryIdeas {
    pub async fn insert(&self, idea: Idea) {
        self.ideas.lock().await.insert(idea.id, idea);
    }

    pub async fn idea(&self, id: Uuid) -> Idea {
        self.ideas.lock().await.get(&id).cloned().expect("idea exists")
    }

    pub async fn content(&self, id: Uuid) -> Option<String> {
        self.contents.lock().await.get(&id).cloned()
    }

    fn not_found(id: Uuid) -> PortError {
        PortError::NotFound(format!("Idea {} not found", id))
    }
}

#[async_trait]
impl IdeaRepository for InMemoryIdeas {
    async fn create_idea(&self, idea: &Idea) -> PortResult<Idea> {
        self.ideas.lock().await.insert(idea.id, idea.clone());
        Ok(idea.clone())
    }

    async fn get_idea(&self, idea_id: Uuid) -> PortResult<Idea> {
        self.ideas
            .lock()
            .await
            .get(&idea_id)
            .cloned()
            .ok_or_else(|| Self::not_found(idea_id))
    }

    async fn delete_idea(&self, idea_id: Uuid) -> PortResult<Idea> {
        self.contents.lock().await.remove(&idea_id);
        self.ideas
            .lock()
            .await
            .remove(&idea_id)
            .ok_or_else(|| Self::not_found(idea_id))
    }

    async fn mark_processing(&self, idea_id: Uuid) -> PortResult<()> {
        let mut ideas = self.ideas.lock().await;
        let idea = ideas.get_mut(&idea_id).ok_or_else(|| Self::not_found(idea_id))?;
        idea.status = IdeaStatus::Processing;
        idea.error = None;
        idea.updated_at = Utc::now();
        self.status_log.lock().await.push(IdeaStatus::Processing);
        Ok(())
    }

    async fn save_extracted_text(&self, idea_id: Uuid, text: &str) -> PortResult<()> {
        self.contents.lock().await.insert(idea_id, text.to_string());
        Ok(())
    }

    async fn get_extracted_text(&self, idea_id: Uuid) -> PortResult<Option<String>> {
        Ok(self.contents.lock().await.get(&idea_id).cloned())
    }

    async fn complete_idea(&self, idea_id: Uuid, update: &IdeaAnalysisUpdate) -> PortResult<()> {
        let mut ideas = self.ideas.lock().await;
        let idea = ideas.get_mut(&idea_id).ok_or_else(|| Self::not_found(idea_id))?;
        idea.status = update.completion.status();
        idea.error = update.completion.error().map(str::to_string);
        idea.summary = Some(update.summary.clone());
        idea.detailed_analysis = update.detailed_analysis.clone();
        idea.topic = Some(update.topic.clone());
        idea.suggested_links = update.suggested_links.clone();
        idea.drive_file_id = update.drive_file_id.clone();
        idea.updated_at = Utc::now();
        self.status_log.lock().await.push(idea.status);
        Ok(())
    }

    async fn mark_failed(&self, idea_id: Uuid, error: &str) -> PortResult<()> {
        let mut ideas = self.ideas.lock().await;
        if let Some(idea) = ideas.get_mut(&idea_id) {
            idea.status = IdeaStatus::Failed;
            idea.error = Some(error.to_string());
        }
        self.status_log.lock().await.push(IdeaStatus::Failed);
        Ok(())
    }
}

// =============================================================================
// Secret store
// =============================================================================

#[derive(Default)]
pub struct InMemorySecrets {
    pub secrets: Mutex<HashMap<Uuid, UserSecret>>,
}

impl InMemorySecrets {
    pub async fn stored_token(&self, user_id: Uuid) -> Option<String> {
        self.secrets
            .lock()
            .await
            .get(&user_id)
            .and_then(|s| s.encrypted_refresh_token.clone())
    }
}

#[async_trait]
impl SecretStore for InMemorySecrets {
    async fn get_user_secret(&self, user_id: Uuid) -> PortResult<Option<UserSecret>> {
        Ok(self.secrets.lock().await.get(&user_id).cloned())
    }

    async fn put_user_secret(
        &self,
        user_id: Uuid,
        encrypted_refresh_token: &str,
    ) -> PortResult<()> {
        self.secrets.lock().await.insert(
            user_id,
            UserSecret {
                user_id,
                encrypted_refresh_token: Some(encrypted_refresh_token.to_string()),
                updated_at: Utc::now(),
            },
        );
        Ok(())
    }
}

// =============================================================================
// Extractor
// =============================================================================

pub struct StaticExtractor {
    result: Result<String, ExtractionFailure>,
    pub calls: Mutex<Vec<String>>,
}

impl StaticExtractor {
    pub fn returning(result: Result<String, ExtractionFailure>) -> Self {
        Self {
            result,
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ContentExtractor for StaticExtractor {
    async fn extract(&self, reference: &str) -> Result<String, ExtractionFailure> {
        self.calls.lock().await.push(reference.to_string());
        self.result.clone()
    }
}

// =============================================================================
// Summarizers
// =============================================================================

/// Feeds a fixed raw model reply through the real response parser.
pub struct ScriptedSummarizer {
    raw_reply: String,
    pub received: Mutex<Vec<(String, Option<String>)>>,
}

impl ScriptedSummarizer {
    pub fn replying(raw_reply: &str) -> Self {
        Self {
            raw_reply: raw_reply.to_string(),
            received: Mutex::new(Vec::new()),
        }
    }

    pub async fn last_text(&self) -> String {
        self.received
            .lock()
            .await
            .last()
            .map(|(text, _)| text.clone())
            .expect("summarizer was called")
    }
}

#[async_trait]
impl SummarizationService for ScriptedSummarizer {
    async fn summarize(&self, text: &str, prompt_template: Option<&str>) -> AnalysisOutcome {
        self.received
            .lock()
            .await
            .push((text.to_string(), prompt_template.map(str::to_string)));
        parse_analysis(&self.raw_reply)
    }
}

pub struct PanickingSummarizer;

#[async_trait]
impl SummarizationService for PanickingSummarizer {
    async fn summarize(&self, _text: &str, _prompt_template: Option<&str>) -> AnalysisOutcome {
        panic!("model client exploded");
    }
}

/// A well-formed reply carrying a long-form analysis.
pub const DETAILED_REPLY: &str = r#"```json
{
  "overview": "Rust makes systems programming safer.",
  "detailedAnalysis": "Rust's ownership model removes whole classes of bugs.",
  "topic": "Technology",
  "suggestedLinks": [
    {"title": "The Book", "url": "https://doc.rust-lang.org/book/", "description": "Official guide"},
    {"title": "Broken", "url": "not-a-url", "description": "dropped"}
  ]
}
```"#;

/// A well-formed reply without a long-form analysis.
pub const SHORT_REPLY: &str =
    r#"{"overview": "A quick thought about bread.", "topic": "Food", "suggestedLinks": []}"#;

pub fn expected_links() -> Vec<SuggestedLink> {
    vec![SuggestedLink {
        title: "The Book".into(),
        url: "https://doc.rust-lang.org/book/".into(),
        description: "Official guide".into(),
    }]
}

// =============================================================================
// Credentials and archive
// =============================================================================

#[derive(Default)]
pub struct FakeCredentials {
    /// Users with offline access.
    pub connected: Mutex<Vec<Uuid>>,
    pub requests: Mutex<Vec<Uuid>>,
}

impl FakeCredentials {
    pub fn connected(user_id: Uuid) -> Self {
        Self {
            connected: Mutex::new(vec![user_id]),
            requests: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl CredentialProvider for FakeCredentials {
    async fn get_credentials(&self, user_id: Uuid) -> Option<AccessCredential> {
        self.requests.lock().await.push(user_id);
        if !self.connected.lock().await.contains(&user_id) {
            return None;
        }
        let mut credential = AccessCredential::from_refresh_token("1//refresh".to_string().into());
        credential.apply_refresh("ya29.access".to_string().into(), Utc::now() + Duration::hours(1));
        Some(credential)
    }

    async fn exchange_code(
        &self,
        user_id: Uuid,
        code: &str,
        _redirect_uri: &str,
    ) -> PortResult<CodeExchangeOutcome> {
        match code {
            "good" => {
                self.connected.lock().await.push(user_id);
                Ok(CodeExchangeOutcome::Stored)
            }
            "again" => Ok(CodeExchangeOutcome::ConsentRequired),
            _ => Ok(CodeExchangeOutcome::Rejected("Bad Request".to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub filename: String,
    pub content: String,
    pub folder: String,
}

pub struct RecordingArchive {
    upload_result: Option<String>,
    delete_result: bool,
    pub uploads: Mutex<Vec<Upload>>,
    pub deletes: Mutex<Vec<String>>,
}

impl RecordingArchive {
    pub fn new(upload_result: Option<&str>, delete_result: bool) -> Self {
        Self {
            upload_result: upload_result.map(str::to_string),
            delete_result,
            uploads: Mutex::new(Vec::new()),
            deletes: Mutex::new(Vec::new()),
        }
    }
}

impl Default for RecordingArchive {
    fn default() -> Self {
        Self::new(Some("drive-file-1"), true)
    }
}

#[async_trait]
impl ArchiveService for RecordingArchive {
    async fn upload_markdown(
        &self,
        _credential: &AccessCredential,
        filename: &str,
        content: &str,
        folder: &str,
    ) -> Option<String> {
        self.uploads.lock().await.push(Upload {
            filename: filename.to_string(),
            content: content.to_string(),
            folder: folder.to_string(),
        });
        self.upload_result.clone()
    }

    async fn delete_file(&self, _credential: &AccessCredential, file_id: &str) -> bool {
        self.deletes.lock().await.push(file_id.to_string());
        self.delete_result
    }
}

// =============================================================================
// Harness
// =============================================================================

pub struct TestHarness {
    pub ideas: Arc<InMemoryIdeas>,
    pub extractor: Arc<StaticExtractor>,
    pub credentials: Arc<FakeCredentials>,
    pub archive: Arc<RecordingArchive>,
    pub state: Arc<AppState>,
}

impl TestHarness {
    pub fn new(
        extraction: Result<String, ExtractionFailure>,
        summarizer: Arc<dyn SummarizationService>,
        credentials: FakeCredentials,
        archive: RecordingArchive,
    ) -> Self {
        let ideas = Arc::new(InMemoryIdeas::default());
        let extractor = Arc::new(StaticExtractor::returning(extraction));
        let credentials = Arc::new(credentials);
        let archive = Arc::new(archive);
        let state = Arc::new(AppState::new(
            ideas.clone(),
            extractor.clone(),
            summarizer,
            credentials.clone(),
            archive.clone(),
        ));
        Self {
            ideas,
            extractor,
            credentials,
            archive,
            state,
        }
    }

    pub fn with_summarizer(summarizer: Arc<dyn SummarizationService>) -> Self {
        Self::new(
            Ok("unused".to_string()),
            summarizer,
            FakeCredentials::default(),
            RecordingArchive::default(),
        )
    }
}

/// Polls until the idea reaches a terminal status.
pub async fn wait_for_terminal(ideas: &InMemoryIdeas, id: Uuid) -> Idea {
    for _ in 0..200 {
        if let Some(idea) = ideas.ideas.lock().await.get(&id) {
            if idea.status.is_terminal() {
                return idea.clone();
            }
        }
        tokio::time::sleep(StdDuration::from_millis(10)).await;
    }
    panic!("idea {} never reached a terminal status", id);
}
