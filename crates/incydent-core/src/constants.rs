//! Fixed keys and shared limits.

/// Local store key for the persisted personal profile.
pub const PROFILE_KEY: &str = "personal_profile";

/// Local store key for the cached credential + identity profile JSON.
pub const SESSION_KEY: &str = "session";

/// Local store key for the recipient autocomplete history.
pub const RECIPIENT_HISTORY_KEY: &str = "recipient_history";

/// Maximum length of a displayed address before truncation.
pub const MAX_ADDRESS_LEN: usize = 100;
