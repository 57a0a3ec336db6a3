//! Integration tests for the credential adapter against a local fake token endpoint.

mod common;

use crate::common::InMemorySecrets;
use api_lib::{
    adapters::{GoogleCredentialAdapter, OAuthClient, TokenCipher},
    config::OAuthClientConfig,
};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::post,
    Form, Router,
};
use idea_farm_core::ports::{CodeExchangeOutcome, CredentialProvider, SecretStore};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

const REFRESH_TOKEN: &str = "1//0g-refresh-token";

// =============================================================================
// Fake token endpoint
// =============================================================================

#[derive(Default)]
struct TokenEndpoint {
    /// Every form posted to the endpoint.
    requests: Mutex<Vec<HashMap<String, String>>>,
}

fn field<'a>(form: &'a HashMap<String, String>, name: &str) -> &'a str {
    form.get(name).map(String::as_str).unwrap_or_default()
}

async fn token(
    State(endpoint): State<Arc<TokenEndpoint>>,
    Form(form): Form<HashMap<String, String>>,
) -> impl IntoResponse {
    endpoint.requests.lock().await.push(form.clone());

    if field(&form, "client_id") != "client-id" || field(&form, "client_secret") != "client-secret" {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "invalid_client", "error_description": "Unauthorized" })),
        );
    }

    match (
        field(&form, "grant_type"),
        field(&form, "code"),
        field(&form, "refresh_token"),
    ) {
        ("refresh_token", _, REFRESH_TOKEN) => (
            StatusCode::OK,
            Json(json!({ "access_token": "ya29.fresh", "expires_in": 3599, "token_type": "Bearer" })),
        ),
        ("authorization_code", "good", _) => (
            StatusCode::OK,
            Json(json!({ "access_token": "ya29.first", "expires_in": 3599, "refresh_token": REFRESH_TOKEN })),
        ),
        ("authorization_code", "repeat", _) => (
            StatusCode::OK,
            Json(json!({ "access_token": "ya29.first", "expires_in": 3599 })),
        ),
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid_grant", "error_description": "Bad Request" })),
        ),
    }
}

struct Fixture {
    endpoint: Arc<TokenEndpoint>,
    secrets: Arc<InMemorySecrets>,
    cipher: Arc<TokenCipher>,
    adapter: GoogleCredentialAdapter,
}

async fn fixture(with_client: bool) -> Fixture {
    let endpoint = Arc::new(TokenEndpoint::default());
    let app = Router::new()
        .route("/token", post(token))
        .with_state(endpoint.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let token_url = format!("http://{}/token", listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let secrets = Arc::new(InMemorySecrets::default());
    let cipher = Arc::new(TokenCipher::new(&fernet::Fernet::generate_key()).unwrap());
    let oauth = with_client.then(|| {
        OAuthClient::new(
            reqwest::Client::new(),
            token_url,
            OAuthClientConfig {
                client_id: "client-id".to_string(),
                client_secret: "client-secret".to_string(),
            },
        )
    });
    let adapter = GoogleCredentialAdapter::new(secrets.clone(), cipher.clone(), oauth);
    Fixture {
        endpoint,
        secrets,
        cipher,
        adapter,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn exchanged_token_is_stored_encrypted_and_refreshes() {
    let fx = fixture(true).await;
    let user_id = Uuid::new_v4();

    let outcome = fx
        .adapter
        .exchange_code(user_id, "good", "http://localhost:3000/callback")
        .await
        .unwrap();
    assert_eq!(outcome, CodeExchangeOutcome::Stored);

    let stored = fx.secrets.stored_token(user_id).await.unwrap();
    assert!(!stored.contains(REFRESH_TOKEN));

    let credential = fx.adapter.get_credentials(user_id).await.unwrap();
    assert_eq!(credential.access_token(), Some("ya29.fresh"));
    assert_eq!(credential.refresh_token(), REFRESH_TOKEN);

    let requests = fx.endpoint.requests.lock().await;
    assert_eq!(requests[0]["grant_type"], "authorization_code");
    assert_eq!(requests[0]["redirect_uri"], "http://localhost:3000/callback");
    assert_eq!(requests[1]["grant_type"], "refresh_token");
}

#[tokio::test]
async fn missing_refresh_token_requires_consent() {
    let fx = fixture(true).await;
    let user_id = Uuid::new_v4();

    let outcome = fx.adapter.exchange_code(user_id, "repeat", "uri").await.unwrap();

    assert_eq!(outcome, CodeExchangeOutcome::ConsentRequired);
    assert!(fx.secrets.stored_token(user_id).await.is_none());
}

#[tokio::test]
async fn rejected_code_carries_the_error_description() {
    let fx = fixture(true).await;

    let outcome = fx
        .adapter
        .exchange_code(Uuid::new_v4(), "expired-code", "uri")
        .await
        .unwrap();

    assert_eq!(outcome, CodeExchangeOutcome::Rejected("Bad Request".to_string()));
}

#[tokio::test]
async fn user_without_secret_has_no_credentials() {
    let fx = fixture(true).await;

    assert!(fx.adapter.get_credentials(Uuid::new_v4()).await.is_none());
    assert!(fx.endpoint.requests.lock().await.is_empty());
}

#[tokio::test]
async fn undecryptable_secret_yields_no_credentials() {
    let fx = fixture(true).await;
    let user_id = Uuid::new_v4();
    let foreign = TokenCipher::new(&fernet::Fernet::generate_key()).unwrap();
    fx.secrets
        .put_user_secret(user_id, &foreign.encrypt(REFRESH_TOKEN))
        .await
        .unwrap();

    assert!(fx.adapter.get_credentials(user_id).await.is_none());
    assert!(fx.endpoint.requests.lock().await.is_empty());
}

#[tokio::test]
async fn revoked_refresh_token_yields_no_credentials() {
    let fx = fixture(true).await;
    let user_id = Uuid::new_v4();
    fx.secrets
        .put_user_secret(user_id, &fx.cipher.encrypt("1//revoked"))
        .await
        .unwrap();

    assert!(fx.adapter.get_credentials(user_id).await.is_none());
    assert_eq!(fx.endpoint.requests.lock().await.len(), 1);
}

#[tokio::test]
async fn missing_client_identity_disables_offline_access() {
    let fx = fixture(false).await;
    let user_id = Uuid::new_v4();
    fx.secrets
        .put_user_secret(user_id, &fx.cipher.encrypt(REFRESH_TOKEN))
        .await
        .unwrap();

    assert!(fx.adapter.get_credentials(user_id).await.is_none());
    assert!(fx.adapter.exchange_code(user_id, "good", "uri").await.is_err());
}
