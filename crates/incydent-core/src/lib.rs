//! Incydent core library
//!
//! Shared domain models, configuration, validation, and the local key/value
//! store used by every other incydent crate.

pub mod config;
pub mod constants;
pub mod models;
pub mod store;
pub mod validation;

// Re-export commonly used types
pub use config::{Config, ConfigError, SmtpConfig};
pub use models::media::{MediaBuffer, MediaItem, MediaKind, PreviewHandle, PreviewRegistry};
pub use models::profile::{PersonalProfile, ProfileStore};
pub use models::report::{Coordinates, ReportDraft};
pub use models::session::{AccessCredential, Session, SessionStore, UserProfile};
pub use models::upload::{UploadPhase, UploadRecord};
pub use store::{FileStore, LocalStore, MemoryStore, StoreError};
