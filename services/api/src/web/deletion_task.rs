//! services/api/src/web/deletion_task.rs
//!
//! Cleanup for the idea-deleted event: removes the archived document, if any.

use crate::web::state::AppState;
use idea_farm_core::domain::Idea;
use std::sync::Arc;
use tracing::{info, warn};

/// Deletes the archived copy of a removed idea. Every failure is logged and dropped.
pub async fn process_deleted_idea(app_state: Arc<AppState>, idea: Idea) {
    let idea_id = idea.id;
    let Some(file_id) = idea.drive_file_id.as_deref() else {
        info!(%idea_id, "Deleted idea has no archived file");
        return;
    };

    let Some(credential) = app_state.credentials.get_credentials(idea.user_id).await else {
        info!(%idea_id, user_id = %idea.user_id, "No credentials available. Skipping archive cleanup.");
        return;
    };

    if app_state.archive.delete_file(&credential, file_id).await {
        info!(%idea_id, drive_file_id = %file_id, "Archived file deleted");
    } else {
        warn!(%idea_id, drive_file_id = %file_id, "Failed to delete archived file");
    }
}
