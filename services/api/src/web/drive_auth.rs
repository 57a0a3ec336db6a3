//! services/api/src/web/drive_auth.rs
//!
//! Handler for connecting a user's Drive: trades an OAuth authorization code for a
//! stored, encrypted refresh token.

use crate::web::{rest::user_id_from_headers, state::AppState};
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Json,
};
use idea_farm_core::ports::CodeExchangeOutcome;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeCodeRequest {
    pub code: String,
    pub redirect_uri: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeCodeResponse {
    /// `stored` or `consent_required`.
    pub status: String,
    pub message: String,
}

/// Exchange an authorization code for offline Drive access.
#[utoipa::path(
    post,
    path = "/auth/drive/exchange",
    request_body = ExchangeCodeRequest,
    responses(
        (status = 200, description = "Exchange finished", body = ExchangeCodeResponse),
        (status = 400, description = "Missing header or the code was rejected"),
        (status = 500, description = "Server misconfigured or storage failure")
    ),
    params(
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn exchange_code_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<ExchangeCodeRequest>,
) -> Result<Json<ExchangeCodeResponse>, (StatusCode, String)> {
    let user_id = user_id_from_headers(&headers)?;
    if payload.code.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "code must not be empty".to_string()));
    }

    let outcome = app_state
        .credentials
        .exchange_code(user_id, &payload.code, &payload.redirect_uri)
        .await
        .map_err(|e| {
            error!(%user_id, "Code exchange failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;

    match outcome {
        CodeExchangeOutcome::Stored => {
            info!(%user_id, "Offline access stored");
            Ok(Json(ExchangeCodeResponse {
                status: "stored".to_string(),
                message: "Offline access enabled".to_string(),
            }))
        }
        CodeExchangeOutcome::ConsentRequired => {
            warn!(%user_id, "No refresh token returned; user must re-consent");
            Ok(Json(ExchangeCodeResponse {
                status: "consent_required".to_string(),
                message: "No refresh token returned. Revoke access and sign in again with consent."
                    .to_string(),
            }))
        }
        CodeExchangeOutcome::Rejected(description) => {
            warn!(%user_id, "Authorization code rejected: {}", description);
            Err((StatusCode::BAD_REQUEST, description))
        }
    }
}
