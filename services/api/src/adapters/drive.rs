//! services/api/src/adapters/drive.rs
//!
//! This module contains the archive adapter backed by the Google Drive v3 REST API.
//! It implements the `ArchiveService` port from the `core` crate.

use async_trait::async_trait;
use idea_farm_core::{
    domain::AccessCredential,
    ports::{ArchiveService, PortError, PortResult},
};
use reqwest::{header::CONTENT_TYPE, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";
const MARKDOWN_MIME_TYPE: &str = "text/markdown";

#[derive(Deserialize)]
struct DriveFile {
    id: String,
}

#[derive(Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

#[derive(Clone)]
pub struct DriveArchiveAdapter {
    http: reqwest::Client,
    api_base: String,
    upload_base: String,
}

/// Quotes a value for use inside a Drive `q` expression.
fn escape_query_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Builds a `multipart/related` body holding the file metadata and its content.
fn multipart_related_body(boundary: &str, metadata: &str, content: &str) -> String {
    format!(
        "--{b}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{metadata}\r\n\
         --{b}\r\nContent-Type: {mime}; charset=UTF-8\r\n\r\n{content}\r\n--{b}--\r\n",
        b = boundary,
        metadata = metadata,
        mime = MARKDOWN_MIME_TYPE,
        content = content,
    )
}

async fn send_checked(request: RequestBuilder, action: &str) -> PortResult<Response> {
    let response = request
        .send()
        .await
        .map_err(|e| PortError::Unexpected(format!("{} failed: {}", action, e)))?;
    let status = response.status();
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(PortError::Unauthorized);
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(PortError::Unexpected(format!(
            "{} failed with status {}: {}",
            action, status, body
        )));
    }
    Ok(response)
}

impl DriveArchiveAdapter {
    pub fn new(http: reqwest::Client, api_base: String, upload_base: String) -> Self {
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            upload_base: upload_base.trim_end_matches('/').to_string(),
        }
    }

    fn bearer(credential: &AccessCredential) -> PortResult<&str> {
        credential.access_token().ok_or(PortError::Unauthorized)
    }

    /// Finds a non-trashed folder by name that the credential can see.
    pub async fn find_folder(
        &self,
        credential: &AccessCredential,
        folder_name: &str,
    ) -> PortResult<Option<String>> {
        let query = format!(
            "mimeType='{}' and name='{}' and trashed=false",
            FOLDER_MIME_TYPE,
            escape_query_value(folder_name)
        );
        let request = self
            .http
            .get(format!("{}/files", self.api_base))
            .bearer_auth(Self::bearer(credential)?)
            .query(&[
                ("q", query.as_str()),
                ("fields", "files(id, name)"),
                ("spaces", "drive"),
            ]);
        let list: FileList = send_checked(request, "folder search")
            .await?
            .json()
            .await
            .map_err(|e| PortError::Unexpected(format!("folder search response: {}", e)))?;
        Ok(list.files.into_iter().next().map(|f| f.id))
    }

    async fn create_folder(
        &self,
        credential: &AccessCredential,
        folder_name: &str,
    ) -> PortResult<String> {
        let request = self
            .http
            .post(format!("{}/files", self.api_base))
            .bearer_auth(Self::bearer(credential)?)
            .query(&[("fields", "id")])
            .json(&json!({ "name": folder_name, "mimeType": FOLDER_MIME_TYPE }));
        let file: DriveFile = send_checked(request, "folder creation")
            .await?
            .json()
            .await
            .map_err(|e| PortError::Unexpected(format!("folder creation response: {}", e)))?;
        info!(folder = %folder_name, folder_id = %file.id, "Created archive folder");
        Ok(file.id)
    }

    /// Finds the folder, creating it only when the search came back empty.
    pub async fn resolve_folder(
        &self,
        credential: &AccessCredential,
        folder_name: &str,
    ) -> PortResult<String> {
        match self.find_folder(credential, folder_name).await? {
            Some(folder_id) => Ok(folder_id),
            None => self.create_folder(credential, folder_name).await,
        }
    }

    async fn upload_into(
        &self,
        credential: &AccessCredential,
        folder_id: &str,
        filename: &str,
        content: &str,
    ) -> PortResult<String> {
        let boundary = format!("idea_farm_{}", Uuid::new_v4().simple());
        let metadata = json!({
            "name": filename,
            "mimeType": MARKDOWN_MIME_TYPE,
            "parents": [folder_id],
        })
        .to_string();

        let request = self
            .http
            .post(format!("{}/files", self.upload_base))
            .bearer_auth(Self::bearer(credential)?)
            .query(&[("uploadType", "multipart"), ("fields", "id")])
            .header(
                CONTENT_TYPE,
                format!("multipart/related; boundary={}", boundary),
            )
            .body(multipart_related_body(&boundary, &metadata, content));
        let file: DriveFile = send_checked(request, "upload")
            .await?
            .json()
            .await
            .map_err(|e| PortError::Unexpected(format!("upload response: {}", e)))?;
        Ok(file.id)
    }
}

//=========================================================================================
// `ArchiveService` Trait Implementation
//=========================================================================================

#[async_trait]
impl ArchiveService for DriveArchiveAdapter {
    async fn upload_markdown(
        &self,
        credential: &AccessCredential,
        filename: &str,
        content: &str,
        folder: &str,
    ) -> Option<String> {
        let result = async {
            let folder_id = self.resolve_folder(credential, folder).await?;
            self.upload_into(credential, &folder_id, filename, content)
                .await
        }
        .await;

        match result {
            Ok(file_id) => {
                info!(file = %filename, file_id = %file_id, "Uploaded archive file");
                Some(file_id)
            }
            Err(e) => {
                error!(file = %filename, "Error uploading archive file: {}", e);
                None
            }
        }
    }

    async fn delete_file(&self, credential: &AccessCredential, file_id: &str) -> bool {
        let token = match Self::bearer(credential) {
            Ok(token) => token,
            Err(e) => {
                warn!(file_id = %file_id, "Cannot delete archive file: {}", e);
                return false;
            }
        };
        let request = self
            .http
            .delete(format!("{}/files/{}", self.api_base, file_id))
            .bearer_auth(token);
        match send_checked(request, "delete").await {
            Ok(_) => true,
            Err(e) => {
                warn!(file_id = %file_id, "Error deleting archive file: {}", e);
                false
            }
        }
    }
}
