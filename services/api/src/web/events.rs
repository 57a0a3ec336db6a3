//! services/api/src/web/events.rs
//!
//! Entry points for an external trigger delivering idea lifecycle events.
//! Delivery is at-least-once, so a repeated creation event simply starts a new run.

use crate::web::{
    deletion_task::process_deleted_idea, idea_task::process_new_idea, rest::IdeaDocument,
    state::AppState,
};
use axum::{extract::State, http::StatusCode, response::Json};
use std::sync::Arc;
use tracing::info;

/// Run the pipeline for an idea document.
#[utoipa::path(
    post,
    path = "/events/idea-created",
    request_body = IdeaDocument,
    responses(
        (status = 202, description = "Pipeline run scheduled")
    )
)]
pub async fn idea_created_handler(
    State(app_state): State<Arc<AppState>>,
    Json(document): Json<IdeaDocument>,
) -> StatusCode {
    info!(idea_id = %document.id, "Received idea-created event");
    tokio::spawn(process_new_idea(app_state, document.into()));
    StatusCode::ACCEPTED
}

/// Clean up after an idea that was deleted elsewhere.
#[utoipa::path(
    post,
    path = "/events/idea-deleted",
    request_body = IdeaDocument,
    responses(
        (status = 202, description = "Cleanup scheduled")
    )
)]
pub async fn idea_deleted_handler(
    State(app_state): State<Arc<AppState>>,
    Json(document): Json<IdeaDocument>,
) -> StatusCode {
    info!(idea_id = %document.id, "Received idea-deleted event");
    tokio::spawn(process_deleted_idea(app_state, document.into()));
    StatusCode::ACCEPTED
}
