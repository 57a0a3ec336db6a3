pub mod deletion_task;
pub mod drive_auth;
pub mod events;
pub mod idea_task;
pub mod rest;
pub mod state;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

pub use deletion_task::process_deleted_idea;
pub use idea_task::process_new_idea;
pub use rest::{
    create_idea_handler, delete_idea_handler, get_idea_content_handler, get_idea_handler,
};

use self::state::AppState;

/// Every API route, bound to the shared state. Layers are added by the binary.
pub fn api_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ideas", post(create_idea_handler))
        .route("/ideas/{id}", get(get_idea_handler).delete(delete_idea_handler))
        .route("/ideas/{id}/content", get(get_idea_content_handler))
        .route("/events/idea-created", post(events::idea_created_handler))
        .route("/events/idea-deleted", post(events::idea_deleted_handler))
        .route("/auth/drive/exchange", post(drive_auth::exchange_code_handler))
        .with_state(app_state)
}
