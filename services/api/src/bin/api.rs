//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{
        summarizer_from_config, DbAdapter, DriveArchiveAdapter, GoogleCredentialAdapter,
        OAuthClient, TokenCipher, UrlContentExtractor,
    },
    config::Config,
    error::ApiError,
    web::{api_router, rest::ApiDoc, state::AppState},
};
use axum::http::{header::CONTENT_TYPE, HeaderName, HeaderValue, Method};
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

const OUTBOUND_TIMEOUT: Duration = Duration::from_secs(30);

/// Reads `summary.md` from the prompts directory when it exists.
async fn load_prompt_override(prompts_path: &Path) -> Option<String> {
    let path = prompts_path.join("summary.md");
    match tokio::fs::read_to_string(&path).await {
        Ok(template) if !template.trim().is_empty() => {
            info!(path = %path.display(), "Loaded summary prompt override");
            Some(template)
        }
        Ok(_) => {
            warn!(path = %path.display(), "Summary prompt override is empty; using the built-in prompt");
            None
        }
        Err(_) => None,
    }
}

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize Service Adapters ---
    let cipher = Arc::new(TokenCipher::new(&config.fernet_key)?);
    let http = reqwest::Client::builder().timeout(OUTBOUND_TIMEOUT).build()?;

    let oauth = match config.oauth_client.clone() {
        Some(client) => Some(OAuthClient::new(
            http.clone(),
            config.oauth_token_url.clone(),
            client,
        )),
        None => {
            warn!("GOOGLE_CLIENT_ID/GOOGLE_CLIENT_SECRET not set; Drive archival is disabled");
            None
        }
    };
    let credentials = Arc::new(GoogleCredentialAdapter::new(
        db_adapter.clone(),
        cipher,
        oauth,
    ));
    let archive = Arc::new(DriveArchiveAdapter::new(
        http,
        config.drive_api_base.clone(),
        config.drive_upload_base.clone(),
    ));
    let extractor = Arc::new(UrlContentExtractor::new(config.extract_timeout)?);
    let summarizer = summarizer_from_config(&config.summarizer)?;
    info!(
        provider = ?config.summarizer.provider,
        model = %config.summarizer.model,
        "Summarizer ready"
    );

    // --- 4. Build the Shared AppState ---
    let prompt_template = load_prompt_override(&config.prompts_path).await;
    let app_state = Arc::new(
        AppState::new(db_adapter, extractor, summarizer, credentials, archive)
            .with_archive_folder(config.archive_folder.clone())
            .with_prompt_template(prompt_template),
    );

    // --- 5. Create the Web Router ---
    let cors_origin = config.cors_origin.parse::<HeaderValue>().map_err(|e| {
        ApiError::Internal(format!("Invalid CORS_ORIGIN '{}': {}", config.cors_origin, e))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(cors_origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, HeaderName::from_static("x-user-id")]);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router(app_state))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
