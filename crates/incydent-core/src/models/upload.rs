//! Per-file upload tracking.

use uuid::Uuid;

/// Upload lifecycle for one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadPhase {
    Pending,
    Uploading,
    Completed,
    Failed,
}

/// Progress record for one file during an active upload.
///
/// Fields are private so the invariant `percent == 100 ⇔ Completed` cannot
/// be broken from outside: in-flight progress is capped at 99 and only
/// [`complete`](UploadRecord::complete) reaches 100.
#[derive(Debug, Clone)]
pub struct UploadRecord {
    file_id: Uuid,
    percent_complete: u8,
    phase: UploadPhase,
    remote_reference: Option<String>,
}

impl UploadRecord {
    pub fn new(file_id: Uuid) -> Self {
        UploadRecord {
            file_id,
            percent_complete: 0,
            phase: UploadPhase::Pending,
            remote_reference: None,
        }
    }

    pub fn file_id(&self) -> Uuid {
        self.file_id
    }

    pub fn percent(&self) -> u8 {
        self.percent_complete
    }

    pub fn phase(&self) -> UploadPhase {
        self.phase
    }

    pub fn remote_reference(&self) -> Option<&str> {
        self.remote_reference.as_deref()
    }

    pub fn start(&mut self) {
        if self.phase == UploadPhase::Pending {
            self.phase = UploadPhase::Uploading;
        }
    }

    /// Record transport progress. Monotonic non-decreasing, capped at 99
    /// until the upload is confirmed complete.
    pub fn set_progress(&mut self, percent: u8) {
        if self.phase == UploadPhase::Completed || self.phase == UploadPhase::Failed {
            return;
        }
        let capped = percent.min(99);
        if capped > self.percent_complete {
            self.percent_complete = capped;
        }
    }

    pub fn complete(&mut self, remote_reference: String) {
        self.phase = UploadPhase::Completed;
        self.percent_complete = 100;
        self.remote_reference = Some(remote_reference);
    }

    pub fn fail(&mut self) {
        if self.phase != UploadPhase::Completed {
            self.phase = UploadPhase::Failed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_is_monotonic_and_capped() {
        let mut record = UploadRecord::new(Uuid::new_v4());
        record.start();
        record.set_progress(40);
        record.set_progress(20);
        assert_eq!(record.percent(), 40);
        record.set_progress(100);
        assert_eq!(record.percent(), 99);
        assert_eq!(record.phase(), UploadPhase::Uploading);
    }

    #[test]
    fn only_completion_reaches_one_hundred() {
        let mut record = UploadRecord::new(Uuid::new_v4());
        record.start();
        record.set_progress(99);
        record.complete("https://drive.example/f/1".to_string());
        assert_eq!(record.percent(), 100);
        assert_eq!(record.phase(), UploadPhase::Completed);
        assert_eq!(
            record.remote_reference(),
            Some("https://drive.example/f/1")
        );
    }

    #[test]
    fn failure_keeps_percent_below_one_hundred() {
        let mut record = UploadRecord::new(Uuid::new_v4());
        record.start();
        record.set_progress(80);
        record.fail();
        assert_eq!(record.phase(), UploadPhase::Failed);
        assert!(record.percent() < 100);
        // Late progress from a dead transfer is ignored.
        record.set_progress(95);
        assert_eq!(record.percent(), 80);
    }

    #[test]
    fn failure_does_not_demote_a_completed_record() {
        let mut record = UploadRecord::new(Uuid::new_v4());
        record.complete("url".to_string());
        record.fail();
        assert_eq!(record.phase(), UploadPhase::Completed);
    }
}
