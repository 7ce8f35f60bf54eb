//! Report workflow: upload orchestration, recipient selection, message
//! composition, mail transport, and the screen-by-screen state machine that
//! owns all of it.

pub mod compose;
pub mod machine;
pub mod mailer;
pub mod orchestrator;
pub mod recipients;

pub use compose::compose_body;
pub use machine::{ReportWorkflow, Stage, WorkflowError};
pub use mailer::{Mailer, SendError, SmtpMailer};
pub use orchestrator::{UploadError, UploadOrchestrator, UploadOutcome, UploadTask};
pub use recipients::{
    DirectoryEntry, RecipientError, RecipientHistory, RecipientList, RECIPIENT_DIRECTORY,
};
