//! Storage provider abstraction and the drive HTTP backend.
//!
//! The workflow talks to [`StorageProvider`] only; the concrete backend
//! uploads through the drive API's resumable protocol.

pub mod drive;
pub mod traits;

pub use drive::DriveStorage;
pub use traits::{
    FileUpload, ProgressSink, RemoteFolder, StorageError, StorageProvider, StorageResult,
};
