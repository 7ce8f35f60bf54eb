//! Drive API backend.
//!
//! Folder creation plus resumable uploads: initiate a session, PUT chunks
//! with `Content-Range`, report progress after every acknowledged chunk.

use std::time::Duration;

use incydent_core::AccessCredential;
use reqwest::header::{CONTENT_RANGE, LOCATION};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tokio::io::AsyncReadExt;

use crate::traits::{
    FileUpload, ProgressSink, RemoteFolder, StorageError, StorageProvider, StorageResult,
};

const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";
const RESUME_INCOMPLETE: u16 = 308;

#[derive(Deserialize)]
struct FileMetadata {
    id: String,
    #[serde(rename = "webViewLink")]
    web_view_link: Option<String>,
}

/// Storage backend over the drive HTTP API.
#[derive(Clone)]
pub struct DriveStorage {
    client: Client,
    base_url: String,
    chunk_bytes: usize,
}

impl DriveStorage {
    pub fn new(base_url: impl Into<String>, chunk_bytes: usize) -> StorageResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(DriveStorage {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            chunk_bytes: chunk_bytes.max(1),
        })
    }

    fn bearer(&self, request: reqwest::RequestBuilder, credential: &AccessCredential) -> reqwest::RequestBuilder {
        request.header("Authorization", format!("Bearer {}", credential.secret()))
    }

    async fn error_from(status: StatusCode, response: reqwest::Response, context: &str) -> StorageError {
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            StorageError::Unauthorized(format!("{}: {}", context, text))
        } else {
            StorageError::UploadFailed(format!("{} with status {}: {}", context, status, text))
        }
    }

    fn file_url(&self, id: &str, link: Option<String>) -> String {
        link.unwrap_or_else(|| format!("{}/drive/v3/files/{}", self.base_url, id))
    }

    /// Start a resumable upload session; returns the session URI.
    async fn initiate_session(
        &self,
        credential: &AccessCredential,
        folder_id: &str,
        upload: &FileUpload,
        total: u64,
    ) -> StorageResult<String> {
        let metadata = serde_json::json!({
            "name": upload.name,
            "parents": [folder_id],
        });
        let request = self
            .client
            .post(format!(
                "{}/upload/drive/v3/files?uploadType=resumable&fields=id,webViewLink",
                self.base_url
            ))
            .header("X-Upload-Content-Type", &upload.content_type)
            .header("X-Upload-Content-Length", total)
            .json(&metadata);
        let response = self.bearer(request, credential).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::error_from(status, response, "Upload initiation failed").await);
        }
        response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                StorageError::InvalidResponse("Missing resumable session URI".to_string())
            })
    }
}

#[async_trait::async_trait]
impl StorageProvider for DriveStorage {
    async fn create_folder(
        &self,
        credential: &AccessCredential,
        name: &str,
    ) -> StorageResult<RemoteFolder> {
        let body = serde_json::json!({
            "name": name,
            "mimeType": FOLDER_MIME_TYPE,
        });
        let request = self
            .client
            .post(format!(
                "{}/drive/v3/files?fields=id,webViewLink",
                self.base_url
            ))
            .json(&body);
        let response = self.bearer(request, credential).send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(if status == StatusCode::UNAUTHORIZED {
                StorageError::Unauthorized(text)
            } else {
                StorageError::FolderCreationFailed(format!("status {}: {}", status, text))
            });
        }
        let metadata: FileMetadata = response
            .json()
            .await
            .map_err(|e| StorageError::InvalidResponse(e.to_string()))?;

        // Grant anyone-with-link visibility so the reference in the report
        // is readable by the recipients.
        let permission = serde_json::json!({ "role": "reader", "type": "anyone" });
        let request = self
            .client
            .post(format!(
                "{}/drive/v3/files/{}/permissions",
                self.base_url, metadata.id
            ))
            .json(&permission);
        let response = self.bearer(request, credential).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(StorageError::FolderCreationFailed(format!(
                "sharing failed with status {}: {}",
                status, text
            )));
        }

        let folder = RemoteFolder {
            shareable_url: self.file_url(&metadata.id, metadata.web_view_link),
            id: metadata.id,
        };
        tracing::info!(folder_id = %folder.id, "Destination folder created");
        Ok(folder)
    }

    async fn upload_file(
        &self,
        credential: &AccessCredential,
        folder_id: &str,
        upload: FileUpload,
        sink: ProgressSink,
    ) -> StorageResult<String> {
        if credential.is_empty() {
            return Err(StorageError::Unauthorized(
                "No access credential".to_string(),
            ));
        }

        let total = tokio::fs::metadata(&upload.path).await?.len();
        let session_uri = self
            .initiate_session(credential, folder_id, &upload, total)
            .await?;

        let mut file = tokio::fs::File::open(&upload.path).await?;
        let mut offset: u64 = 0;

        loop {
            let mut chunk = vec![0u8; self.chunk_bytes];
            let read = read_full(&mut file, &mut chunk).await?;
            chunk.truncate(read);
            if read == 0 && total > 0 {
                return Err(StorageError::UploadFailed(format!(
                    "{} ended at {} of {} bytes",
                    upload.name, offset, total
                )));
            }

            let range = content_range(offset, read as u64, total);
            let response = self
                .client
                .put(&session_uri)
                .header(CONTENT_RANGE, range)
                .body(chunk)
                .send()
                .await?;

            let status = response.status();
            if status.as_u16() == RESUME_INCOMPLETE {
                offset += read as u64;
                sink(chunk_percent(offset, total));
                continue;
            }
            if status.is_success() {
                offset += read as u64;
                let metadata: FileMetadata = response
                    .json()
                    .await
                    .map_err(|e| StorageError::InvalidResponse(e.to_string()))?;
                sink(100);
                tracing::debug!(file = %upload.name, bytes = total, "Upload finished");
                return Ok(self.file_url(&metadata.id, metadata.web_view_link));
            }
            return Err(Self::error_from(status, response, "Chunk upload failed").await);
        }
    }
}

/// Fill `buf` from the reader, short only at EOF.
async fn read_full(
    file: &mut tokio::fs::File,
    buf: &mut [u8],
) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = file.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

/// `Content-Range` header value for one chunk. A zero-length file sends a
/// single empty chunk with the `*/0` form.
fn content_range(offset: u64, len: u64, total: u64) -> String {
    if total == 0 {
        "bytes */0".to_string()
    } else {
        format!("bytes {}-{}/{}", offset, offset + len - 1, total)
    }
}

/// Whole-file percentage after `uploaded` of `total` bytes.
fn chunk_percent(uploaded: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    ((uploaded.saturating_mul(100)) / total).min(100) as u8
}
