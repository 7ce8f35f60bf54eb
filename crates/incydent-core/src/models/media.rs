//! Evidence media: kind classification, preview handles, capture buffer.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use uuid::Uuid;

/// Kind of a piece of evidence, derived once from the declared content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
    Document,
}

impl MediaKind {
    pub fn from_content_type(content_type: &str) -> Self {
        if content_type.starts_with("image/") {
            MediaKind::Image
        } else if content_type.starts_with("video/") {
            MediaKind::Video
        } else {
            MediaKind::Document
        }
    }

    /// Display label, one per tag.
    pub fn label(&self) -> &'static str {
        match self {
            MediaKind::Image => "zdjęcie",
            MediaKind::Video => "wideo",
            MediaKind::Document => "dokument",
        }
    }
}

/// Declared content type for a file extension.
pub fn content_type_for_extension(ext: &str) -> &'static str {
    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "avi" => "video/x-msvideo",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

/// Transient, revocable preview reference for one media item.
///
/// Issued by a [`PreviewRegistry`]; the buffer revokes it when the item is
/// removed or the buffer is cleared. An unrevoked handle is a leak.
#[derive(Debug, Clone)]
pub struct PreviewHandle {
    token: Uuid,
    url: String,
}

impl PreviewHandle {
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[derive(Default)]
struct PreviewCounts {
    issued: usize,
    revoked: usize,
    active: HashSet<Uuid>,
}

/// Issues and revokes preview handles, counting both sides so leak checks
/// can assert revoked == issued after a reset.
#[derive(Default)]
pub struct PreviewRegistry {
    counts: Mutex<PreviewCounts>,
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self) -> PreviewHandle {
        let token = Uuid::new_v4();
        let mut counts = self.counts.lock().unwrap();
        counts.issued += 1;
        counts.active.insert(token);
        PreviewHandle {
            token,
            url: format!("preview://{}", token),
        }
    }

    /// Revoke a handle. Revoking twice is a no-op.
    pub fn revoke(&self, handle: &PreviewHandle) {
        let mut counts = self.counts.lock().unwrap();
        if counts.active.remove(&handle.token) {
            counts.revoked += 1;
        }
    }

    pub fn issued(&self) -> usize {
        self.counts.lock().unwrap().issued
    }

    pub fn revoked(&self) -> usize {
        self.counts.lock().unwrap().revoked
    }

    pub fn active(&self) -> usize {
        self.counts.lock().unwrap().active.len()
    }
}

/// One piece of evidence selected by the user.
#[derive(Debug, Clone)]
pub struct MediaItem {
    pub id: Uuid,
    pub kind: MediaKind,
    pub preview: PreviewHandle,
    pub display_name: String,
    pub size_bytes: u64,
    pub content_type: String,
    pub path: PathBuf,
}

/// In-memory list of selected evidence files.
///
/// Sole owner of its items; removal and clearing revoke preview handles.
pub struct MediaBuffer {
    registry: Arc<PreviewRegistry>,
    items: Vec<MediaItem>,
}

impl MediaBuffer {
    pub fn new() -> Self {
        Self::with_registry(Arc::new(PreviewRegistry::new()))
    }

    pub fn with_registry(registry: Arc<PreviewRegistry>) -> Self {
        MediaBuffer {
            registry,
            items: Vec::new(),
        }
    }

    pub fn registry(&self) -> &Arc<PreviewRegistry> {
        &self.registry
    }

    /// Add a file from disk. Kind and content type are derived from the
    /// extension once, at capture time.
    pub fn add_file(&mut self, path: &Path) -> std::io::Result<Uuid> {
        let metadata = fs::metadata(path)?;
        let display_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let content_type = path
            .extension()
            .and_then(|e| e.to_str())
            .map(content_type_for_extension)
            .unwrap_or("application/octet-stream");

        let item = MediaItem {
            id: Uuid::new_v4(),
            kind: MediaKind::from_content_type(content_type),
            preview: self.registry.issue(),
            display_name,
            size_bytes: metadata.len(),
            content_type: content_type.to_string(),
            path: path.to_path_buf(),
        };
        let id = item.id;
        tracing::debug!(%id, kind = ?item.kind, name = %item.display_name, "Evidence added");
        self.items.push(item);
        Ok(id)
    }

    /// Remove one item, revoking its preview. Returns false if unknown.
    pub fn remove(&mut self, id: Uuid) -> bool {
        match self.items.iter().position(|i| i.id == id) {
            Some(pos) => {
                let item = self.items.remove(pos);
                self.registry.revoke(&item.preview);
                true
            }
            None => false,
        }
    }

    /// Drop every item, revoking all previews.
    pub fn clear(&mut self) {
        for item in self.items.drain(..) {
            self.registry.revoke(&item.preview);
        }
    }

    pub fn items(&self) -> &[MediaItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Default for MediaBuffer {
    fn default() -> Self {
        Self::new()
    }
}
