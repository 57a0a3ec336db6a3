//! services/api/src/adapters/oauth.rs
//!
//! A thin client for the OAuth token endpoint: authorization-code exchange and
//! refresh-token grants.

use chrono::{DateTime, Duration, Utc};
use idea_farm_core::ports::{PortError, PortResult};
use secrecy::SecretString;
use serde::Deserialize;
use tracing::warn;

use crate::config::OAuthClientConfig;

/// Access tokens are treated as expired this long before the provider says so.
const EXPIRY_SKEW_SECS: i64 = 60;
/// Upper bound on a reported token lifetime.
const MAX_TOKEN_LIFETIME_SECS: i64 = 86_400;

/// Raw token endpoint response. Success and error share one shape.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<i64>,
    refresh_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// A freshly minted access token.
pub struct RefreshedToken {
    pub access_token: SecretString,
    pub expires_at: DateTime<Utc>,
}

/// What came back from an authorization-code exchange.
pub enum CodeGrant {
    /// The long-lived token to store.
    RefreshToken(SecretString),
    /// The code was valid, but no refresh token was issued (repeat consent).
    NoRefreshToken,
    Rejected(String),
}

#[derive(Clone)]
pub struct OAuthClient {
    http: reqwest::Client,
    token_url: String,
    client: OAuthClientConfig,
}

impl OAuthClient {
    pub fn new(http: reqwest::Client, token_url: String, client: OAuthClientConfig) -> Self {
        Self {
            http,
            token_url,
            client,
        }
    }

    async fn post_form(&self, form: &[(&str, &str)]) -> PortResult<TokenResponse> {
        let response = self
            .http
            .post(&self.token_url)
            .form(form)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("token endpoint unreachable: {}", e)))?;

        let status = response.status();
        // Error responses carry a JSON body too, so parse regardless of status.
        let body: TokenResponse = response.json().await.map_err(|e| {
            PortError::Unexpected(format!("token endpoint returned {}: {}", status, e))
        })?;
        Ok(body)
    }

    /// Exchanges an authorization code for tokens.
    pub async fn exchange_code(&self, code: &str, redirect_uri: &str) -> PortResult<CodeGrant> {
        let body = self
            .post_form(&[
                ("code", code),
                ("client_id", self.client.client_id.as_str()),
                ("client_secret", self.client.client_secret.as_str()),
                ("redirect_uri", redirect_uri),
                ("grant_type", "authorization_code"),
            ])
            .await?;

        if let Some(error) = body.error {
            warn!(error = %error, "Authorization code exchange rejected");
            return Ok(CodeGrant::Rejected(
                body.error_description
                    .unwrap_or_else(|| "Token exchange failed".to_string()),
            ));
        }

        match body.refresh_token {
            Some(token) if !token.is_empty() => Ok(CodeGrant::RefreshToken(token.into())),
            _ => Ok(CodeGrant::NoRefreshToken),
        }
    }

    /// Mints a new access token from a refresh token.
    pub async fn refresh(&self, refresh_token: &str) -> PortResult<RefreshedToken> {
        let body = self
            .post_form(&[
                ("refresh_token", refresh_token),
                ("client_id", self.client.client_id.as_str()),
                ("client_secret", self.client.client_secret.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .await?;

        if let Some(error) = body.error {
            return Err(PortError::Unexpected(format!(
                "token refresh rejected: {} {}",
                error,
                body.error_description.unwrap_or_default()
            )));
        }

        let access_token = body
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| PortError::Unexpected("token refresh returned no access_token".into()))?;
        let expires_in = body.expires_in.unwrap_or(3600);

        Ok(RefreshedToken {
            access_token: access_token.into(),
            expires_at: expiry_after(Utc::now(), expires_in),
        })
    }
}

fn expiry_after(now: DateTime<Utc>, expires_in: i64) -> DateTime<Utc> {
    let lifetime = expires_in.clamp(0, MAX_TOKEN_LIFETIME_SECS) - EXPIRY_SKEW_SECS;
    now + Duration::seconds(lifetime.max(0))
}
