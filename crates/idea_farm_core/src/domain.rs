//! crates/idea_farm_core/src/domain.rs
//!
//! Defines the pure, core data structures for the pipeline.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Topic used whenever the model did not produce a usable classification.
pub const DEFAULT_TOPIC: &str = "Uncategorized";

/// Destination folder for archived analyses.
pub const DEFAULT_ARCHIVE_FOLDER: &str = "Idea Farm";

//=========================================================================================
// Idea
//=========================================================================================

/// How the user submitted the idea.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputType {
    Text,
    Url,
}

impl InputType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputType::Text => "text",
            InputType::Url => "url",
        }
    }
}

impl FromStr for InputType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(InputType::Text),
            "url" => Ok(InputType::Url),
            other => Err(format!("unknown input type '{}'", other)),
        }
    }
}

/// Lifecycle of an idea.
///
/// `Ready` and `Failed` end a run. A re-delivered creation event starts a new
/// run, so both terminal states may move back to `Processing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdeaStatus {
    Created,
    Processing,
    Ready,
    Failed,
}

impl IdeaStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdeaStatus::Created => "created",
            IdeaStatus::Processing => "processing",
            IdeaStatus::Ready => "ready",
            IdeaStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, IdeaStatus::Ready | IdeaStatus::Failed)
    }

    /// The transition table for a pipeline run.
    pub fn can_transition_to(&self, next: IdeaStatus) -> bool {
        use IdeaStatus::*;
        matches!(
            (self, next),
            (Created, Processing)
                | (Processing, Ready)
                | (Processing, Failed)
                | (Ready, Processing)
                | (Failed, Processing)
        )
    }
}

impl FromStr for IdeaStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(IdeaStatus::Created),
            "processing" => Ok(IdeaStatus::Processing),
            "ready" => Ok(IdeaStatus::Ready),
            "failed" => Ok(IdeaStatus::Failed),
            other => Err(format!("unknown idea status '{}'", other)),
        }
    }
}

/// A related resource suggested by the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestedLink {
    pub title: String,
    pub url: String,
    pub description: String,
}

/// The user-submitted unit of work.
#[derive(Debug, Clone)]
pub struct Idea {
    pub id: Uuid,
    pub user_id: Uuid,
    pub input_type: InputType,
    pub original_content: String,
    pub status: IdeaStatus,
    pub summary: Option<String>,
    pub detailed_analysis: Option<String>,
    pub topic: Option<String>,
    pub suggested_links: Vec<SuggestedLink>,
    pub drive_file_id: Option<String>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Idea {
    /// A freshly submitted idea, before any pipeline run.
    pub fn new(user_id: Uuid, input_type: InputType, original_content: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            input_type,
            original_content,
            status: IdeaStatus::Created,
            summary: None,
            detailed_analysis: None,
            topic: None,
            suggested_links: Vec::new(),
            drive_file_id: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// How a run ended. Pairs the terminal status with the presence of an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Ready,
    Failed(String),
}

impl Completion {
    pub fn status(&self) -> IdeaStatus {
        match self {
            Completion::Ready => IdeaStatus::Ready,
            Completion::Failed(_) => IdeaStatus::Failed,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Completion::Ready => None,
            Completion::Failed(message) => Some(message),
        }
    }
}

/// Every derived field written at the end of a run, in a single update.
#[derive(Debug, Clone)]
pub struct IdeaAnalysisUpdate {
    pub summary: String,
    pub detailed_analysis: Option<String>,
    pub topic: String,
    pub suggested_links: Vec<SuggestedLink>,
    pub drive_file_id: Option<String>,
    pub completion: Completion,
}

//=========================================================================================
// Analysis
//=========================================================================================

/// The structured analysis produced by the summarizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Analysis {
    pub overview: String,
    pub detailed_analysis: Option<String>,
    pub topic: String,
    pub suggested_links: Vec<SuggestedLink>,
}

impl Analysis {
    /// Values reported alongside a failed summarization.
    pub fn placeholder() -> Self {
        Self {
            overview: "AI Summarization failed.".to_string(),
            detailed_analysis: None,
            topic: DEFAULT_TOPIC.to_string(),
            suggested_links: Vec::new(),
        }
    }
}

/// Why the summarizer could not produce an analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisFailureKind {
    /// The model call itself failed (network, auth, quota).
    Call,
    /// The model answered, but not with the expected JSON document.
    Malformed,
    /// The response was withheld by the safety filters.
    Blocked,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisFailure {
    pub kind: AnalysisFailureKind,
    pub message: String,
}

/// Result of a summarization. Never an exception; callers branch on the variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisOutcome {
    Analyzed(Analysis),
    Failed(AnalysisFailure),
}

impl AnalysisOutcome {
    pub fn failed(kind: AnalysisFailureKind, message: impl Into<String>) -> Self {
        AnalysisOutcome::Failed(AnalysisFailure {
            kind,
            message: message.into(),
        })
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            AnalysisOutcome::Analyzed(_) => None,
            AnalysisOutcome::Failed(failure) => Some(&failure.message),
        }
    }

    /// The analysis, or the placeholder values for a failed run.
    pub fn into_analysis(self) -> Analysis {
        match self {
            AnalysisOutcome::Analyzed(analysis) => analysis,
            AnalysisOutcome::Failed(_) => Analysis::placeholder(),
        }
    }

    pub fn completion(&self) -> Completion {
        match self {
            AnalysisOutcome::Analyzed(_) => Completion::Ready,
            AnalysisOutcome::Failed(failure) => Completion::Failed(failure.message.clone()),
        }
    }
}

//=========================================================================================
// Credentials
//=========================================================================================

/// Per-user encrypted offline-access material, as stored.
#[derive(Debug, Clone)]
pub struct UserSecret {
    pub user_id: Uuid,
    pub encrypted_refresh_token: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// A live access token plus the refresh token it was minted from.
///
/// Not persisted and not `Clone`: each archival attempt owns its own credential.
pub struct AccessCredential {
    refresh_token: SecretString,
    access_token: Option<SecretString>,
    expires_at: Option<DateTime<Utc>>,
}

impl AccessCredential {
    /// A credential that has not been refreshed yet.
    pub fn from_refresh_token(refresh_token: SecretString) -> Self {
        Self {
            refresh_token,
            access_token: None,
            expires_at: None,
        }
    }

    pub fn refresh_token(&self) -> &str {
        self.refresh_token.expose_secret()
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_ref().map(|t| t.expose_secret())
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// True when an access token is present and not yet expired.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        match (&self.access_token, self.expires_at) {
            (Some(_), Some(expires_at)) => expires_at > now,
            (Some(_), None) => true,
            _ => false,
        }
    }

    pub fn apply_refresh(&mut self, access_token: SecretString, expires_at: DateTime<Utc>) {
        self.access_token = Some(access_token);
        self.expires_at = Some(expires_at);
    }
}

impl fmt::Debug for AccessCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessCredential")
            .field("refresh_token", &"[REDACTED]")
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn transition_table_allows_forward_moves_and_reruns() {
        assert!(IdeaStatus::Created.can_transition_to(IdeaStatus::Processing));
        assert!(IdeaStatus::Processing.can_transition_to(IdeaStatus::Ready));
        assert!(IdeaStatus::Processing.can_transition_to(IdeaStatus::Failed));
        assert!(IdeaStatus::Ready.can_transition_to(IdeaStatus::Processing));
        assert!(!IdeaStatus::Created.can_transition_to(IdeaStatus::Ready));
        assert!(!IdeaStatus::Ready.can_transition_to(IdeaStatus::Failed));
        assert!(!IdeaStatus::Processing.can_transition_to(IdeaStatus::Created));
    }

    #[test]
    fn completion_pairs_status_with_error() {
        assert_eq!(Completion::Ready.status(), IdeaStatus::Ready);
        assert!(Completion::Ready.error().is_none());

        let failed = Completion::Failed("model exploded".into());
        assert_eq!(failed.status(), IdeaStatus::Failed);
        assert_eq!(failed.error(), Some("model exploded"));
    }

    #[test]
    fn failed_outcome_reports_placeholders() {
        let outcome = AnalysisOutcome::failed(AnalysisFailureKind::Malformed, "bad json");
        assert_eq!(outcome.error(), Some("bad json"));
        let analysis = outcome.into_analysis();
        assert_eq!(analysis.topic, DEFAULT_TOPIC);
        assert!(analysis.suggested_links.is_empty());
        assert!(analysis.detailed_analysis.is_none());
    }

    #[test]
    fn credential_validity_follows_expiry() {
        let now = Utc::now();
        let mut credential = AccessCredential::from_refresh_token("refresh".to_string().into());
        assert!(!credential.is_valid_at(now));

        credential.apply_refresh("access".to_string().into(), now + Duration::seconds(60));
        assert!(credential.is_valid_at(now));
        assert!(!credential.is_valid_at(now + Duration::seconds(61)));
    }

    #[test]
    fn credential_debug_redacts_tokens() {
        let mut credential =
            AccessCredential::from_refresh_token("1//very-secret".to_string().into());
        credential.apply_refresh("ya29.secret".to_string().into(), Utc::now());
        let rendered = format!("{:?}", credential);
        assert!(!rendered.contains("very-secret"));
        assert!(!rendered.contains("ya29"));
    }
}
