//! services/api/src/adapters/credentials.rs
//!
//! Implements the `CredentialProvider` port: stored ciphertext in, refreshed
//! offline-access credential out.

use async_trait::async_trait;
use chrono::Utc;
use idea_farm_core::{
    domain::AccessCredential,
    ports::{CodeExchangeOutcome, CredentialProvider, PortError, PortResult, SecretStore},
};
use secrecy::ExposeSecret;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::adapters::{
    oauth::{CodeGrant, OAuthClient},
    token_cipher::TokenCipher,
};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

pub struct GoogleCredentialAdapter {
    secrets: Arc<dyn SecretStore>,
    cipher: Arc<TokenCipher>,
    /// `None` when the client id/secret are not configured.
    oauth: Option<OAuthClient>,
}

impl GoogleCredentialAdapter {
    pub fn new(
        secrets: Arc<dyn SecretStore>,
        cipher: Arc<TokenCipher>,
        oauth: Option<OAuthClient>,
    ) -> Self {
        Self {
            secrets,
            cipher,
            oauth,
        }
    }
}

//=========================================================================================
// `CredentialProvider` Trait Implementation
//=========================================================================================

#[async_trait]
impl CredentialProvider for GoogleCredentialAdapter {
    async fn get_credentials(&self, user_id: Uuid) -> Option<AccessCredential> {
        let secret = match self.secrets.get_user_secret(user_id).await {
            Ok(Some(secret)) => secret,
            Ok(None) => {
                info!(%user_id, "No secrets found for user");
                return None;
            }
            Err(e) => {
                error!(%user_id, "Failed to read user secrets: {}", e);
                return None;
            }
        };

        let Some(ciphertext) = secret
            .encrypted_refresh_token
            .filter(|token| !token.trim().is_empty())
        else {
            info!(%user_id, "No refresh token stored for user");
            return None;
        };

        let refresh_token = match self.cipher.decrypt(&ciphertext) {
            Ok(token) => token,
            Err(e) => {
                error!(%user_id, "Failed to decrypt refresh token: {}", e);
                return None;
            }
        };

        let Some(oauth) = &self.oauth else {
            error!("Missing GOOGLE_CLIENT_ID or GOOGLE_CLIENT_SECRET; cannot refresh credentials");
            return None;
        };

        let mut credential = AccessCredential::from_refresh_token(refresh_token);
        if !credential.is_valid_at(Utc::now()) {
            match oauth.refresh(credential.refresh_token()).await {
                Ok(refreshed) => {
                    credential.apply_refresh(refreshed.access_token, refreshed.expires_at)
                }
                Err(e) => {
                    warn!(%user_id, "Failed to refresh credentials: {}", e);
                    return None;
                }
            }
        }

        Some(credential)
    }

    async fn exchange_code(
        &self,
        user_id: Uuid,
        code: &str,
        redirect_uri: &str,
    ) -> PortResult<CodeExchangeOutcome> {
        let oauth = self.oauth.as_ref().ok_or_else(|| {
            PortError::Unexpected("Server misconfigured (missing client id/secret)".to_string())
        })?;

        match oauth.exchange_code(code, redirect_uri).await? {
            CodeGrant::RefreshToken(token) => {
                let ciphertext = self.cipher.encrypt(token.expose_secret());
                self.secrets.put_user_secret(user_id, &ciphertext).await?;
                info!(%user_id, "Stored encrypted refresh token");
                Ok(CodeExchangeOutcome::Stored)
            }
            CodeGrant::NoRefreshToken => {
                warn!(%user_id, "No refresh token returned. User might need to re-consent.");
                Ok(CodeExchangeOutcome::ConsentRequired)
            }
            CodeGrant::Rejected(description) => Ok(CodeExchangeOutcome::Rejected(description)),
        }
    }
}
