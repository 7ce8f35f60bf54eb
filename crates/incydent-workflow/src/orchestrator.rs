//! Evidence upload orchestration.
//!
//! One destination folder per submission session, every file uploaded
//! concurrently, per-file progress aggregated into a single percentage
//! published through a watch channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use incydent_core::{AccessCredential, MediaItem, UploadPhase, UploadRecord};
use incydent_storage::{FileUpload, ProgressSink, RemoteFolder, StorageProvider};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

#[derive(Debug, Clone, Error)]
pub enum UploadError {
    #[error("No access credential; sign in and retry")]
    MissingCredential,

    #[error("Nothing to upload")]
    NothingToUpload,

    #[error("Folder creation failed: {0}")]
    FolderCreationFailed(String),

    #[error("Upload failed for {} file(s)", failed.len())]
    PartialUploadFailure { failed: Vec<Uuid> },

    #[error("Upload task aborted")]
    Aborted,
}

/// Result of a fully successful orchestration.
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub folder: RemoteFolder,
    pub records: Vec<UploadRecord>,
}

/// Handle to a running orchestration: live aggregate progress plus the
/// final outcome. Dropping the handle stops listening; the transfer itself
/// is not cancelled.
pub struct UploadTask {
    progress: watch::Receiver<u8>,
    handle: JoinHandle<Result<UploadOutcome, UploadError>>,
}

impl UploadTask {
    /// Subscribe to the aggregate percentage.
    pub fn progress(&self) -> watch::Receiver<u8> {
        self.progress.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Await the final outcome.
    pub async fn outcome(self) -> Result<UploadOutcome, UploadError> {
        self.handle.await.map_err(|_| UploadError::Aborted)?
    }
}

/// Uploads a media buffer into a fresh, shareable destination folder.
pub struct UploadOrchestrator {
    storage: Arc<dyn StorageProvider>,
    poll_interval: Duration,
}

impl UploadOrchestrator {
    pub fn new(storage: Arc<dyn StorageProvider>, poll_interval: Duration) -> Self {
        UploadOrchestrator {
            storage,
            poll_interval,
        }
    }

    /// Deterministic per-session folder name; distinct sessions do not
    /// collide.
    pub fn folder_name(at: DateTime<Utc>) -> String {
        format!("zgloszenie-{}", at.format("%Y%m%d-%H%M%S"))
    }

    /// Launch the orchestration in the background.
    pub fn start(&self, items: &[MediaItem], credential: &AccessCredential) -> UploadTask {
        let uploads: Vec<FileUpload> = items
            .iter()
            .map(|item| FileUpload {
                file_id: item.id,
                name: item.display_name.clone(),
                content_type: item.content_type.clone(),
                path: item.path.clone(),
            })
            .collect();

        let (tx, rx) = watch::channel(0u8);
        let handle = tokio::spawn(run_upload(
            Arc::clone(&self.storage),
            credential.clone(),
            uploads,
            self.poll_interval,
            tx,
        ));
        UploadTask {
            progress: rx,
            handle,
        }
    }

    /// Run to completion, for callers with nothing to show in between.
    pub async fn upload_all(
        &self,
        items: &[MediaItem],
        credential: &AccessCredential,
    ) -> Result<UploadOutcome, UploadError> {
        self.start(items, credential).outcome().await
    }
}

/// Unweighted mean over all records, rounded; every file counts equally.
fn aggregate_percent(records: &[Mutex<UploadRecord>]) -> u8 {
    if records.is_empty() {
        return 0;
    }
    let sum: u32 = records
        .iter()
        .map(|r| r.lock().unwrap().percent() as u32)
        .sum();
    ((sum as f64 / records.len() as f64).round() as u8).min(100)
}

async fn run_upload(
    storage: Arc<dyn StorageProvider>,
    credential: AccessCredential,
    uploads: Vec<FileUpload>,
    poll_interval: Duration,
    progress_tx: watch::Sender<u8>,
) -> Result<UploadOutcome, UploadError> {
    // Credential gate before any network activity.
    if credential.is_empty() {
        return Err(UploadError::MissingCredential);
    }
    if uploads.is_empty() {
        return Err(UploadError::NothingToUpload);
    }

    // The single folder creation; if it fails nothing else is attempted.
    let name = UploadOrchestrator::folder_name(Utc::now());
    let folder = storage
        .create_folder(&credential, &name)
        .await
        .map_err(|e| UploadError::FolderCreationFailed(e.to_string()))?;

    let records: Arc<Vec<Mutex<UploadRecord>>> = Arc::new(
        uploads
            .iter()
            .map(|u| Mutex::new(UploadRecord::new(u.file_id)))
            .collect(),
    );

    // Aggregation loop: samples record state on a fixed interval and
    // republishes the mean. Never stale by more than one interval.
    let done = Arc::new(AtomicBool::new(false));
    let poller = {
        let records = Arc::clone(&records);
        let done = Arc::clone(&done);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(poll_interval);
            loop {
                interval.tick().await;
                let aggregate = aggregate_percent(&records);
                let _ = progress_tx.send(aggregate);
                if aggregate >= 100 || done.load(Ordering::SeqCst) {
                    let _ = progress_tx.send(aggregate_percent(&records));
                    break;
                }
            }
        })
    };

    // All files at once; per-file latency is independent, so wall-clock is
    // the slowest transfer, not the sum.
    let workers = uploads.into_iter().enumerate().map(|(index, upload)| {
        let storage = Arc::clone(&storage);
        let credential = credential.clone();
        let records = Arc::clone(&records);
        let folder_id = folder.id.clone();
        tokio::spawn(async move {
            records[index].lock().unwrap().start();
            let sink: ProgressSink = {
                let records = Arc::clone(&records);
                Arc::new(move |percent| {
                    records[index].lock().unwrap().set_progress(percent);
                })
            };
            let name = upload.name.clone();
            match storage
                .upload_file(&credential, &folder_id, upload, sink)
                .await
            {
                Ok(url) => records[index].lock().unwrap().complete(url),
                Err(e) => {
                    tracing::warn!(file = %name, error = %e, "Evidence upload failed");
                    records[index].lock().unwrap().fail();
                }
            }
        })
    });
    let _ = join_all(workers).await;

    done.store(true, Ordering::SeqCst);
    let _ = poller.await;

    let final_records: Vec<UploadRecord> = records
        .iter()
        .map(|r| r.lock().unwrap().clone())
        .collect();
    let failed: Vec<Uuid> = final_records
        .iter()
        .filter(|r| r.phase() != UploadPhase::Completed)
        .map(|r| r.file_id())
        .collect();

    if failed.is_empty() {
        tracing::info!(files = final_records.len(), folder = %folder.id, "All evidence uploaded");
        Ok(UploadOutcome {
            folder,
            records: final_records,
        })
    } else {
        // Completed files stay where they are; no rollback.
        Err(UploadError::PartialUploadFailure { failed })
    }
}
