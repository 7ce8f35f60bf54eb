//! Shared test doubles for the workflow integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use incydent_core::{AccessCredential, Config, Session, UserProfile};
use incydent_storage::{
    FileUpload, ProgressSink, RemoteFolder, StorageError, StorageProvider, StorageResult,
};
use incydent_workflow::{Mailer, SendError};
use tokio::sync::Notify;

/// Scriptable storage double. Per-file behavior is keyed by display name.
pub struct MockStorage {
    pub folder_url: String,
    pub fail_folder: bool,
    pub folder_calls: AtomicUsize,
    pub upload_calls: AtomicUsize,
    pub completed: Mutex<Vec<String>>,
    fail_files: Mutex<HashSet<String>>,
    progress_steps: Mutex<HashMap<String, Vec<u8>>>,
    holds: Mutex<HashMap<String, Arc<Notify>>>,
}

impl MockStorage {
    pub fn new() -> Arc<Self> {
        Arc::new(MockStorage {
            folder_url: "https://drive.example/folder".to_string(),
            fail_folder: false,
            folder_calls: AtomicUsize::new(0),
            upload_calls: AtomicUsize::new(0),
            completed: Mutex::new(Vec::new()),
            fail_files: Mutex::new(HashSet::new()),
            progress_steps: Mutex::new(HashMap::new()),
            holds: Mutex::new(HashMap::new()),
        })
    }

    pub fn with_folder_url(url: &str) -> Arc<Self> {
        let mut storage = MockStorage::new();
        Arc::get_mut(&mut storage).unwrap().folder_url = url.to_string();
        storage
    }

    pub fn failing_folder() -> Arc<Self> {
        let mut storage = MockStorage::new();
        Arc::get_mut(&mut storage).unwrap().fail_folder = true;
        storage
    }

    pub fn fail_file(&self, name: &str) {
        self.fail_files.lock().unwrap().insert(name.to_string());
    }

    pub fn set_steps(&self, name: &str, steps: Vec<u8>) {
        self.progress_steps
            .lock()
            .unwrap()
            .insert(name.to_string(), steps);
    }

    /// Block the named file's completion until the returned gate is
    /// notified.
    pub fn hold_file(&self, name: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.holds
            .lock()
            .unwrap()
            .insert(name.to_string(), Arc::clone(&gate));
        gate
    }
}

#[async_trait]
impl StorageProvider for MockStorage {
    async fn create_folder(
        &self,
        credential: &AccessCredential,
        _name: &str,
    ) -> StorageResult<RemoteFolder> {
        self.folder_calls.fetch_add(1, Ordering::SeqCst);
        if credential.is_empty() {
            return Err(StorageError::Unauthorized("no token".to_string()));
        }
        if self.fail_folder {
            return Err(StorageError::FolderCreationFailed("scripted".to_string()));
        }
        Ok(RemoteFolder {
            id: "folder-1".to_string(),
            shareable_url: self.folder_url.clone(),
        })
    }

    async fn upload_file(
        &self,
        _credential: &AccessCredential,
        _folder_id: &str,
        upload: FileUpload,
        sink: ProgressSink,
    ) -> StorageResult<String> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        let steps = self
            .progress_steps
            .lock()
            .unwrap()
            .get(&upload.name)
            .cloned()
            .unwrap_or_else(|| vec![50]);
        for step in steps {
            sink(step);
            tokio::task::yield_now().await;
        }
        let hold = self.holds.lock().unwrap().get(&upload.name).cloned();
        if let Some(gate) = hold {
            gate.notified().await;
        }
        if self.fail_files.lock().unwrap().contains(&upload.name) {
            return Err(StorageError::UploadFailed("scripted failure".to_string()));
        }
        self.completed.lock().unwrap().push(upload.name.clone());
        Ok(format!("https://drive.example/files/{}", upload.name))
    }
}

pub struct SentMail {
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
}

/// Mail double recording every send; failures can be scripted.
pub struct MockMailer {
    pub sent: Mutex<Vec<SentMail>>,
    fail_times: AtomicUsize,
}

impl MockMailer {
    pub fn new() -> Arc<Self> {
        Arc::new(MockMailer {
            sent: Mutex::new(Vec::new()),
            fail_times: AtomicUsize::new(0),
        })
    }

    pub fn fail_next(&self, times: usize) {
        self.fail_times.store(times, Ordering::SeqCst);
    }
}

#[async_trait]
impl Mailer for MockMailer {
    async fn send(&self, to: &[String], subject: &str, body: &str) -> Result<(), SendError> {
        if self.fail_times.load(Ordering::SeqCst) > 0 {
            self.fail_times.fetch_sub(1, Ordering::SeqCst);
            return Err(SendError::Transport("scripted outage".to_string()));
        }
        self.sent.lock().unwrap().push(SentMail {
            to: to.to_vec(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

/// Fast-polling configuration for tests.
pub fn test_config() -> Config {
    Config {
        storage_api_base: "https://drive.example".to_string(),
        upload_chunk_bytes: 512 * 1024,
        progress_poll_interval: Duration::from_millis(10),
        geocode_debounce: Duration::from_millis(10),
        geocode_timeout: Duration::from_secs(5),
        position_timeout: Duration::from_secs(1),
        position_cache_tolerance: Duration::from_secs(300),
        recipient_history_cap: 10,
        default_position: None,
        data_dir: None,
        access_token: None,
        smtp: None,
    }
}

pub fn session() -> Session {
    Session {
        credential: AccessCredential::new("test-token"),
        profile: UserProfile {
            email: "jan@example.com".to_string(),
            name: "Jan".to_string(),
            picture: None,
        },
    }
}

/// Write small evidence files into a temp dir.
pub fn evidence_files(names: &[&str]) -> (tempfile::TempDir, Vec<PathBuf>) {
    let dir = tempfile::tempdir().unwrap();
    let paths = names
        .iter()
        .map(|name| {
            let path = dir.path().join(name);
            std::fs::write(&path, b"evidence-bytes").unwrap();
            path
        })
        .collect();
    (dir, paths)
}
