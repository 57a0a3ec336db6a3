//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the idea REST endpoints, the wire representation
//! of an idea, and the master definition for the OpenAPI specification.

use crate::web::{deletion_task::process_deleted_idea, idea_task::process_new_idea, state::AppState};
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use idea_farm_core::{
    domain::{Idea, IdeaStatus, InputType, SuggestedLink},
    ports::PortError,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        create_idea_handler,
        get_idea_handler,
        get_idea_content_handler,
        delete_idea_handler,
        crate::web::events::idea_created_handler,
        crate::web::events::idea_deleted_handler,
        crate::web::drive_auth::exchange_code_handler,
    ),
    components(
        schemas(
            CreateIdeaRequest,
            IdeaDocument,
            InputTypeDto,
            IdeaStatusDto,
            SuggestedLinkDto,
            IdeaContentResponse,
            crate::web::drive_auth::ExchangeCodeRequest,
            crate::web::drive_auth::ExchangeCodeResponse,
        )
    ),
    tags(
        (name = "Idea Farm API", description = "Capture ideas and links, get them analyzed and archived.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum InputTypeDto {
    Text,
    Url,
}

impl From<InputType> for InputTypeDto {
    fn from(input_type: InputType) -> Self {
        match input_type {
            InputType::Text => InputTypeDto::Text,
            InputType::Url => InputTypeDto::Url,
        }
    }
}

impl From<InputTypeDto> for InputType {
    fn from(dto: InputTypeDto) -> Self {
        match dto {
            InputTypeDto::Text => InputType::Text,
            InputTypeDto::Url => InputType::Url,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum IdeaStatusDto {
    Created,
    Processing,
    Ready,
    Failed,
}

impl From<IdeaStatus> for IdeaStatusDto {
    fn from(status: IdeaStatus) -> Self {
        match status {
            IdeaStatus::Created => IdeaStatusDto::Created,
            IdeaStatus::Processing => IdeaStatusDto::Processing,
            IdeaStatus::Ready => IdeaStatusDto::Ready,
            IdeaStatus::Failed => IdeaStatusDto::Failed,
        }
    }
}

impl From<IdeaStatusDto> for IdeaStatus {
    fn from(dto: IdeaStatusDto) -> Self {
        match dto {
            IdeaStatusDto::Created => IdeaStatus::Created,
            IdeaStatusDto::Processing => IdeaStatus::Processing,
            IdeaStatusDto::Ready => IdeaStatus::Ready,
            IdeaStatusDto::Failed => IdeaStatus::Failed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SuggestedLinkDto {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub description: String,
}

/// The text that was (or will be) handed to the summarizer.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IdeaContentResponse {
    pub idea_id: Uuid,
    pub full_text: String,
}

/// The request payload for submitting a new idea.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateIdeaRequest {
    pub input_type: InputTypeDto,
    /// Raw text, or the URL of a web page or video.
    pub content: String,
}

/// An idea as it travels over HTTP and in event payloads.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IdeaDocument {
    pub id: Uuid,
    pub user_id: Uuid,
    pub input_type: InputTypeDto,
    pub original_content: String,
    pub status: IdeaStatusDto,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub detailed_analysis: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub suggested_links: Vec<SuggestedLinkDto>,
    #[serde(default)]
    pub drive_file_id: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl From<Idea> for IdeaDocument {
    fn from(idea: Idea) -> Self {
        Self {
            id: idea.id,
            user_id: idea.user_id,
            input_type: idea.input_type.into(),
            original_content: idea.original_content,
            status: idea.status.into(),
            summary: idea.summary,
            detailed_analysis: idea.detailed_analysis,
            topic: idea.topic,
            suggested_links: idea
                .suggested_links
                .into_iter()
                .map(|l| SuggestedLinkDto {
                    title: l.title,
                    url: l.url,
                    description: l.description,
                })
                .collect(),
            drive_file_id: idea.drive_file_id,
            error: idea.error,
            created_at: idea.created_at,
            updated_at: idea.updated_at,
        }
    }
}

impl From<IdeaDocument> for Idea {
    fn from(doc: IdeaDocument) -> Self {
        Self {
            id: doc.id,
            user_id: doc.user_id,
            input_type: doc.input_type.into(),
            original_content: doc.original_content,
            status: doc.status.into(),
            summary: doc.summary,
            detailed_analysis: doc.detailed_analysis,
            topic: doc.topic,
            suggested_links: doc
                .suggested_links
                .into_iter()
                .map(|l| SuggestedLink {
                    title: l.title,
                    url: l.url,
                    description: l.description,
                })
                .collect(),
            drive_file_id: doc.drive_file_id,
            error: doc.error,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        }
    }
}

//=========================================================================================
// Shared Handler Helpers
//=========================================================================================

/// Reads the caller's id from the `x-user-id` header.
pub fn user_id_from_headers(headers: &HeaderMap) -> Result<Uuid, (StatusCode, String)> {
    let user_id_str = headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                "x-user-id header is required".to_string(),
            )
        })?;

    Uuid::parse_str(user_id_str).map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            "Invalid x-user-id format".to_string(),
        )
    })
}

fn port_error_response(e: PortError, action: &str) -> (StatusCode, String) {
    match e {
        PortError::NotFound(message) => (StatusCode::NOT_FOUND, message),
        other => {
            error!("Failed to {}: {:?}", action, other);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to {}", action),
            )
        }
    }
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Submit a new idea.
///
/// The idea is stored with status `created` and the pipeline starts in the background.
#[utoipa::path(
    post,
    path = "/ideas",
    request_body = CreateIdeaRequest,
    responses(
        (status = 201, description = "Idea created; processing has started", body = IdeaDocument),
        (status = 400, description = "Bad request (e.g., missing header or empty content)"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn create_idea_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<CreateIdeaRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let user_id = user_id_from_headers(&headers)?;

    let content = payload.content.trim();
    if content.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "content must not be empty".to_string(),
        ));
    }

    let idea = Idea::new(user_id, payload.input_type.into(), content.to_string());
    let created = app_state
        .ideas
        .create_idea(&idea)
        .await
        .map_err(|e| port_error_response(e, "create idea"))?;
    info!(idea_id = %created.id, %user_id, "Idea created");

    tokio::spawn(process_new_idea(app_state.clone(), created.clone()));

    Ok((StatusCode::CREATED, Json(IdeaDocument::from(created))))
}

/// Fetch an idea and its analysis.
#[utoipa::path(
    get,
    path = "/ideas/{id}",
    responses(
        (status = 200, description = "The idea", body = IdeaDocument),
        (status = 404, description = "No idea with this id")
    ),
    params(
        ("id" = Uuid, Path, description = "The idea id.")
    )
)]
pub async fn get_idea_handler(
    State(app_state): State<Arc<AppState>>,
    Path(idea_id): Path<Uuid>,
) -> Result<Json<IdeaDocument>, (StatusCode, String)> {
    let idea = app_state
        .ideas
        .get_idea(idea_id)
        .await
        .map_err(|e| port_error_response(e, "load idea"))?;
    Ok(Json(idea.into()))
}

/// Fetch the extracted text stored for an idea.
#[utoipa::path(
    get,
    path = "/ideas/{id}/content",
    responses(
        (status = 200, description = "The extracted text", body = IdeaContentResponse),
        (status = 404, description = "No idea with this id, or no text extracted yet")
    ),
    params(
        ("id" = Uuid, Path, description = "The idea id.")
    )
)]
pub async fn get_idea_content_handler(
    State(app_state): State<Arc<AppState>>,
    Path(idea_id): Path<Uuid>,
) -> Result<Json<IdeaContentResponse>, (StatusCode, String)> {
    let full_text = app_state
        .ideas
        .get_extracted_text(idea_id)
        .await
        .map_err(|e| port_error_response(e, "load idea content"))?
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                format!("No extracted text for idea {}", idea_id),
            )
        })?;
    Ok(Json(IdeaContentResponse { idea_id, full_text }))
}

/// Delete an idea. Its archived copy is removed in the background.
#[utoipa::path(
    delete,
    path = "/ideas/{id}",
    responses(
        (status = 204, description = "Idea deleted"),
        (status = 404, description = "No idea with this id")
    ),
    params(
        ("id" = Uuid, Path, description = "The idea id.")
    )
)]
pub async fn delete_idea_handler(
    State(app_state): State<Arc<AppState>>,
    Path(idea_id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    let deleted = app_state
        .ideas
        .delete_idea(idea_id)
        .await
        .map_err(|e| port_error_response(e, "delete idea"))?;
    info!(%idea_id, "Idea deleted");

    tokio::spawn(process_deleted_idea(app_state.clone(), deleted));

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_uses_camel_case_and_lowercase_enums() {
        let idea = Idea::new(Uuid::new_v4(), InputType::Url, "https://example.com".into());
        let json = serde_json::to_value(IdeaDocument::from(idea)).unwrap();
        assert_eq!(json["inputType"], "url");
        assert_eq!(json["status"], "created");
        assert_eq!(json["originalContent"], "https://example.com");
        assert!(json["suggestedLinks"].as_array().unwrap().is_empty());
    }

    #[test]
    fn minimal_event_payload_decodes() {
        let id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let doc: IdeaDocument = serde_json::from_value(serde_json::json!({
            "id": id,
            "userId": user_id,
            "inputType": "text",
            "originalContent": "a thought",
            "status": "created"
        }))
        .unwrap();
        let idea = Idea::from(doc);
        assert_eq!(idea.id, id);
        assert_eq!(idea.input_type, InputType::Text);
        assert!(idea.drive_file_id.is_none());
    }

    #[test]
    fn user_header_is_required_and_validated() {
        let mut headers = HeaderMap::new();
        assert_eq!(user_id_from_headers(&headers).unwrap_err().0, StatusCode::BAD_REQUEST);
        headers.insert("x-user-id", "nope".parse().unwrap());
        assert_eq!(user_id_from_headers(&headers).unwrap_err().0, StatusCode::BAD_REQUEST);
        let user_id = Uuid::new_v4();
        headers.insert("x-user-id", user_id.to_string().parse().unwrap());
        assert_eq!(user_id_from_headers(&headers).unwrap(), user_id);
    }
}
