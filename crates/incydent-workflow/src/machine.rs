//! Report workflow state machine.
//!
//! Linear screen sequence Evidence → Details → Recipients → Sent. The
//! machine is the sole owner of the media buffer, the draft, and the
//! recipient selection; collaborators report results back and the machine
//! decides.

use std::path::Path;
use std::sync::Arc;

use incydent_core::store::LocalStore;
use incydent_core::{
    Config, Coordinates, MediaBuffer, MediaItem, ProfileStore, ReportDraft, Session,
};
use incydent_storage::StorageProvider;
use thiserror::Error;
use tokio::sync::watch;
use uuid::Uuid;

use crate::compose::compose_body;
use crate::mailer::Mailer;
use crate::orchestrator::{UploadError, UploadOrchestrator, UploadOutcome, UploadTask};
use crate::recipients::{RecipientError, RecipientHistory, RecipientList};

/// Workflow screens, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Evidence,
    Details,
    Recipients,
    Sent,
}

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Validation failed: {field} is required")]
    Validation { field: &'static str },

    #[error("Invalid transition from {from:?}")]
    InvalidTransition { from: Stage },

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Recipient(#[from] RecipientError),

    #[error("Send failed: {0}")]
    SendFailed(String),
}

/// Drives one report from evidence collection to the sent confirmation.
pub struct ReportWorkflow {
    stage: Stage,
    buffer: MediaBuffer,
    draft: ReportDraft,
    recipients: RecipientList,
    session: Session,
    orchestrator: UploadOrchestrator,
    mailer: Arc<dyn Mailer>,
    profile_store: ProfileStore,
    history: RecipientHistory,
    upload: Option<UploadTask>,
    upload_outcome: Option<UploadOutcome>,
    upload_error: Option<UploadError>,
}

impl ReportWorkflow {
    pub fn new(
        config: &Config,
        session: Session,
        storage: Arc<dyn StorageProvider>,
        mailer: Arc<dyn Mailer>,
        local_store: Arc<dyn LocalStore>,
    ) -> Self {
        ReportWorkflow {
            stage: Stage::Evidence,
            buffer: MediaBuffer::new(),
            draft: ReportDraft::default(),
            recipients: RecipientList::new(),
            session,
            orchestrator: UploadOrchestrator::new(storage, config.progress_poll_interval),
            mailer,
            profile_store: ProfileStore::new(Arc::clone(&local_store)),
            history: RecipientHistory::new(local_store, config.recipient_history_cap),
            upload: None,
            upload_outcome: None,
            upload_error: None,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn draft(&self) -> &ReportDraft {
        &self.draft
    }

    // -- Evidence screen -----------------------------------------------------

    pub fn add_evidence(&mut self, path: &Path) -> std::io::Result<Uuid> {
        self.buffer.add_file(path)
    }

    pub fn remove_evidence(&mut self, id: Uuid) -> bool {
        self.buffer.remove(id)
    }

    pub fn evidence(&self) -> &[MediaItem] {
        self.buffer.items()
    }

    pub fn buffer(&self) -> &MediaBuffer {
        &self.buffer
    }

    /// Evidence → Details. Requires a non-empty buffer; starts the upload
    /// orchestration in the background so the user can fill the form while
    /// it runs.
    pub fn advance_to_details(&mut self) -> Result<(), WorkflowError> {
        if self.stage != Stage::Evidence {
            return Err(WorkflowError::InvalidTransition { from: self.stage });
        }
        if self.buffer.is_empty() {
            return Err(WorkflowError::Validation { field: "evidence" });
        }

        // A re-entered evidence screen relaunches the orchestration; the
        // previous task keeps running but nobody listens to it anymore.
        self.upload_outcome = None;
        self.upload_error = None;
        self.draft.evidence_folder_reference = None;
        self.upload = Some(
            self.orchestrator
                .start(self.buffer.items(), &self.session.credential),
        );

        tracing::debug!(files = self.buffer.len(), "Entering details screen, upload started");
        self.stage = Stage::Details;
        Ok(())
    }

    // -- Details screen ------------------------------------------------------

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.draft.title = title.into();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.draft.description = description.into();
    }

    /// Address and pin always change together.
    pub fn set_location(&mut self, address: String, coordinates: Option<Coordinates>) {
        self.draft.set_location(address, coordinates);
    }

    pub fn back_to_evidence(&mut self) -> Result<(), WorkflowError> {
        if self.stage != Stage::Details {
            return Err(WorkflowError::InvalidTransition { from: self.stage });
        }
        self.stage = Stage::Evidence;
        Ok(())
    }

    /// Details → Recipients. Title, description and location must all be
    /// filled in.
    pub fn advance_to_recipients(&mut self) -> Result<(), WorkflowError> {
        if self.stage != Stage::Details {
            return Err(WorkflowError::InvalidTransition { from: self.stage });
        }
        if self.draft.title.trim().is_empty() {
            return Err(WorkflowError::Validation { field: "title" });
        }
        if self.draft.description.trim().is_empty() {
            return Err(WorkflowError::Validation { field: "description" });
        }
        if self
            .draft
            .location
            .as_deref()
            .map(str::trim)
            .unwrap_or("")
            .is_empty()
        {
            return Err(WorkflowError::Validation { field: "location" });
        }
        self.stage = Stage::Recipients;
        Ok(())
    }

    // -- Recipients screen ---------------------------------------------------

    /// Add a recipient. Valid new addresses also land in the autocomplete
    /// history.
    pub fn add_recipient(&mut self, address: &str) -> Result<bool, WorkflowError> {
        let added = self.recipients.add(address)?;
        if added {
            if let Err(e) = self.history.remember(address) {
                tracing::warn!(error = %e, "Failed to persist recipient history");
            }
        }
        Ok(added)
    }

    pub fn remove_recipient(&mut self, address: &str) -> bool {
        self.recipients.remove(address)
    }

    pub fn recipients(&self) -> &[String] {
        self.recipients.addresses()
    }

    pub fn recipient_suggestions(&self, prefix: &str) -> Vec<String> {
        self.history.suggestions(prefix)
    }

    pub fn back_to_details(&mut self) -> Result<(), WorkflowError> {
        if self.stage != Stage::Recipients {
            return Err(WorkflowError::InvalidTransition { from: self.stage });
        }
        self.stage = Stage::Details;
        Ok(())
    }

    // -- Upload status -------------------------------------------------------

    /// Aggregate upload progress, if an orchestration is running or done.
    pub fn upload_progress(&self) -> Option<watch::Receiver<u8>> {
        self.upload.as_ref().map(|task| task.progress())
    }

    /// Captured background upload failure, shown as a banner; it does not
    /// force the user back.
    pub fn upload_error(&self) -> Option<&UploadError> {
        self.upload_error.as_ref()
    }

    /// Resolve the background upload if it has not been consumed yet, and
    /// cache the evidence folder reference in the draft.
    async fn ensure_upload_outcome(&mut self) -> Result<String, WorkflowError> {
        if let Some(reference) = &self.draft.evidence_folder_reference {
            return Ok(reference.clone());
        }
        if let Some(error) = &self.upload_error {
            return Err(WorkflowError::Upload(error.clone()));
        }
        let task = self
            .upload
            .take()
            .ok_or(WorkflowError::Upload(UploadError::NothingToUpload))?;
        match task.outcome().await {
            Ok(outcome) => {
                let reference = outcome.folder.shareable_url.clone();
                self.draft.evidence_folder_reference = Some(reference.clone());
                self.upload_outcome = Some(outcome);
                Ok(reference)
            }
            Err(error) => {
                self.upload_error = Some(error.clone());
                Err(WorkflowError::Upload(error))
            }
        }
    }

    /// Per-file results of a completed orchestration.
    pub fn upload_outcome(&self) -> Option<&UploadOutcome> {
        self.upload_outcome.as_ref()
    }

    // -- Send ----------------------------------------------------------------

    /// Recipients → Sent. Awaits the background upload (the folder
    /// reference is part of the body), composes the message and transmits
    /// it. On failure the machine stays in Recipients with everything
    /// intact, so the user can retry immediately.
    pub async fn send(&mut self) -> Result<(), WorkflowError> {
        if self.stage != Stage::Recipients {
            return Err(WorkflowError::InvalidTransition { from: self.stage });
        }
        if self.recipients.is_empty() {
            return Err(WorkflowError::Validation { field: "recipients" });
        }

        self.ensure_upload_outcome().await?;
        let profile = self.profile_store.load();
        let body = compose_body(&self.draft, profile.as_ref());

        self.mailer
            .send(self.recipients.addresses(), &self.draft.title, &body)
            .await
            .map_err(|e| WorkflowError::SendFailed(e.to_string()))?;

        tracing::info!(recipients = self.recipients.len(), "Report sent");
        self.stage = Stage::Sent;
        Ok(())
    }

    // -- New report ----------------------------------------------------------

    /// Sent → Evidence. Clears the buffer (revoking every preview), the
    /// draft, the recipient selection, and all upload/send error state.
    pub fn new_report(&mut self) -> Result<(), WorkflowError> {
        if self.stage != Stage::Sent {
            return Err(WorkflowError::InvalidTransition { from: self.stage });
        }
        self.buffer.clear();
        self.draft.reset();
        self.recipients.clear();
        self.upload = None;
        self.upload_outcome = None;
        self.upload_error = None;
        self.stage = Stage::Evidence;
        Ok(())
    }
}
