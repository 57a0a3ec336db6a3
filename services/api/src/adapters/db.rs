//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `IdeaRepository` and `SecretStore` ports from the `core` crate. It handles
//! all interactions with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use idea_farm_core::domain::{Idea, IdeaAnalysisUpdate, IdeaStatus, SuggestedLink, UserSecret};
use idea_farm_core::ports::{IdeaRepository, PortError, PortResult, SecretStore};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow, PgPool};
use uuid::Uuid;

const IDEA_COLUMNS: &str = "id, user_id, input_type, original_content, status, summary, \
     detailed_analysis, topic, suggested_links, drive_file_id, error, created_at, updated_at";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the persistence ports.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn not_found_or_unexpected(e: sqlx::Error, what: String) -> PortError {
    match e {
        sqlx::Error::RowNotFound => PortError::NotFound(what),
        _ => PortError::Unexpected(e.to_string()),
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(Serialize, Deserialize)]
struct LinkRecord {
    title: String,
    url: String,
    #[serde(default)]
    description: String,
}

impl From<&SuggestedLink> for LinkRecord {
    fn from(link: &SuggestedLink) -> Self {
        Self {
            title: link.title.clone(),
            url: link.url.clone(),
            description: link.description.clone(),
        }
    }
}

#[derive(FromRow)]
struct IdeaRecord {
    id: Uuid,
    user_id: Uuid,
    input_type: String,
    original_content: String,
    status: String,
    summary: Option<String>,
    detailed_analysis: Option<String>,
    topic: Option<String>,
    suggested_links: Json<Vec<LinkRecord>>,
    drive_file_id: Option<String>,
    error: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl IdeaRecord {
    fn to_domain(self) -> PortResult<Idea> {
        Ok(Idea {
            id: self.id,
            user_id: self.user_id,
            input_type: self.input_type.parse().map_err(PortError::Unexpected)?,
            original_content: self.original_content,
            status: self.status.parse().map_err(PortError::Unexpected)?,
            summary: self.summary,
            detailed_analysis: self.detailed_analysis,
            topic: self.topic,
            suggested_links: self
                .suggested_links
                .0
                .into_iter()
                .map(|l| SuggestedLink {
                    title: l.title,
                    url: l.url,
                    description: l.description,
                })
                .collect(),
            drive_file_id: self.drive_file_id,
            error: self.error,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(FromRow)]
struct UserSecretRecord {
    user_id: Uuid,
    encrypted_refresh_token: Option<String>,
    updated_at: DateTime<Utc>,
}

impl UserSecretRecord {
    fn to_domain(self) -> UserSecret {
        UserSecret {
            user_id: self.user_id,
            encrypted_refresh_token: self.encrypted_refresh_token,
            updated_at: self.updated_at,
        }
    }
}

//=========================================================================================
// `IdeaRepository` Trait Implementation
//=========================================================================================

#[async_trait]
impl IdeaRepository for DbAdapter {
    async fn create_idea(&self, idea: &Idea) -> PortResult<Idea> {
        let sql = format!(
            "INSERT INTO ideas (id, user_id, input_type, original_content, status) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            IDEA_COLUMNS
        );
        let record = sqlx::query_as::<_, IdeaRecord>(&sql)
            .bind(idea.id)
            .bind(idea.user_id)
            .bind(idea.input_type.as_str())
            .bind(&idea.original_content)
            .bind(idea.status.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        record.to_domain()
    }

    async fn get_idea(&self, idea_id: Uuid) -> PortResult<Idea> {
        let sql = format!("SELECT {} FROM ideas WHERE id = $1", IDEA_COLUMNS);
        let record = sqlx::query_as::<_, IdeaRecord>(&sql)
            .bind(idea_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| not_found_or_unexpected(e, format!("Idea {} not found", idea_id)))?;
        record.to_domain()
    }

    async fn delete_idea(&self, idea_id: Uuid) -> PortResult<Idea> {
        let sql = format!("DELETE FROM ideas WHERE id = $1 RETURNING {}", IDEA_COLUMNS);
        let record = sqlx::query_as::<_, IdeaRecord>(&sql)
            .bind(idea_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| not_found_or_unexpected(e, format!("Idea {} not found", idea_id)))?;
        record.to_domain()
    }

    async fn mark_processing(&self, idea_id: Uuid) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE ideas SET status = $2, error = NULL, updated_at = now() WHERE id = $1",
        )
        .bind(idea_id)
        .bind(IdeaStatus::Processing.as_str())
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Idea {} not found", idea_id)));
        }
        Ok(())
    }

    async fn save_extracted_text(&self, idea_id: Uuid, text: &str) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO idea_contents (idea_id, full_text) VALUES ($1, $2) \
             ON CONFLICT (idea_id) DO UPDATE SET full_text = EXCLUDED.full_text, updated_at = now()",
        )
        .bind(idea_id)
        .bind(text)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn get_extracted_text(&self, idea_id: Uuid) -> PortResult<Option<String>> {
        let text: Option<(String,)> =
            sqlx::query_as("SELECT full_text FROM idea_contents WHERE idea_id = $1")
                .bind(idea_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(unexpected)?;
        Ok(text.map(|(t,)| t))
    }

    async fn complete_idea(&self, idea_id: Uuid, update: &IdeaAnalysisUpdate) -> PortResult<()> {
        let links: Vec<LinkRecord> = update.suggested_links.iter().map(LinkRecord::from).collect();
        let result = sqlx::query(
            "UPDATE ideas SET status = $2, summary = $3, detailed_analysis = $4, topic = $5, \
             suggested_links = $6, drive_file_id = $7, error = $8, updated_at = now() \
             WHERE id = $1",
        )
        .bind(idea_id)
        .bind(update.completion.status().as_str())
        .bind(&update.summary)
        .bind(&update.detailed_analysis)
        .bind(&update.topic)
        .bind(Json(links))
        .bind(&update.drive_file_id)
        .bind(update.completion.error())
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Idea {} not found", idea_id)));
        }
        Ok(())
    }

    async fn mark_failed(&self, idea_id: Uuid, error: &str) -> PortResult<()> {
        sqlx::query("UPDATE ideas SET status = $2, error = $3, updated_at = now() WHERE id = $1")
            .bind(idea_id)
            .bind(IdeaStatus::Failed.as_str())
            .bind(error)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }
}

//=========================================================================================
// `SecretStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl SecretStore for DbAdapter {
    async fn get_user_secret(&self, user_id: Uuid) -> PortResult<Option<UserSecret>> {
        let record = sqlx::query_as::<_, UserSecretRecord>(
            "SELECT user_id, encrypted_refresh_token, updated_at FROM user_secrets WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.map(UserSecretRecord::to_domain))
    }

    async fn put_user_secret(
        &self,
        user_id: Uuid,
        encrypted_refresh_token: &str,
    ) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO user_secrets (user_id, encrypted_refresh_token) VALUES ($1, $2) \
             ON CONFLICT (user_id) DO UPDATE SET \
             encrypted_refresh_token = EXCLUDED.encrypted_refresh_token, updated_at = now()",
        )
        .bind(user_id)
        .bind(encrypted_refresh_token)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }
}
