//! Storage abstraction trait
//!
//! The upload orchestrator depends on this seam only; backends and test
//! doubles implement it.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use incydent_core::AccessCredential;
use thiserror::Error;
use uuid::Uuid;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Folder creation failed: {0}")]
    FolderCreationFailed(String),

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Remote destination container for one submission session.
#[derive(Debug, Clone)]
pub struct RemoteFolder {
    pub id: String,
    pub shareable_url: String,
}

/// One file handed to the provider for upload.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub file_id: Uuid,
    pub name: String,
    pub content_type: String,
    pub path: PathBuf,
}

/// Per-file progress callback, called with 0–100 percentages.
///
/// Calls for one file are ordered and non-decreasing; nothing is guaranteed
/// across files.
pub type ProgressSink = Arc<dyn Fn(u8) + Send + Sync>;

/// Storage backend seam.
///
/// The credential is always passed by parameter; implementations hold no
/// ambient auth state.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Create the destination folder and return its shareable reference.
    async fn create_folder(
        &self,
        credential: &AccessCredential,
        name: &str,
    ) -> StorageResult<RemoteFolder>;

    /// Upload one file into `folder_id`, reporting progress through `sink`.
    /// Returns the remote URL of the uploaded file.
    async fn upload_file(
        &self,
        credential: &AccessCredential,
        folder_id: &str,
        upload: FileUpload,
        sink: ProgressSink,
    ) -> StorageResult<String>;
}
