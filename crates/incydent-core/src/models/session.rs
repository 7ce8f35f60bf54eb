//! Identity session: opaque credential plus the provider's minimal profile.
//!
//! The credential never lives in ambient state; it is owned by the session
//! and passed by parameter to whatever needs it.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::constants::SESSION_KEY;
use crate::store::{LocalStore, StoreResult};

/// Opaque bearer-style secret from the identity provider.
///
/// The inner value is redacted from `Debug` output so it cannot leak into
/// logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessCredential(String);

impl AccessCredential {
    pub fn new(secret: impl Into<String>) -> Self {
        AccessCredential(secret.into())
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessCredential(***)")
    }
}

/// Minimal identity profile returned by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub email: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
}

/// Authenticated session owned by the workflow.
#[derive(Debug, Clone)]
pub struct Session {
    pub credential: AccessCredential,
    pub profile: UserProfile,
}

#[derive(Serialize, Deserialize)]
struct CachedSession {
    credential: AccessCredential,
    profile: UserProfile,
}

/// Cached credential/profile JSON in the local store (the simple auth
/// variant: the hosted sign-in happens elsewhere, we only keep its result).
#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn LocalStore>,
}

impl SessionStore {
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        SessionStore { store }
    }

    pub fn load(&self) -> Option<Session> {
        let raw = self.store.get(SESSION_KEY)?;
        match serde_json::from_str::<CachedSession>(&raw) {
            Ok(cached) => Some(Session {
                credential: cached.credential,
                profile: cached.profile,
            }),
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unreadable cached session");
                None
            }
        }
    }

    pub fn save(&self, session: &Session) -> StoreResult<()> {
        let cached = CachedSession {
            credential: session.credential.clone(),
            profile: session.profile.clone(),
        };
        let raw = serde_json::to_string(&cached).expect("session serializes");
        self.store.set(SESSION_KEY, &raw)
    }

    pub fn clear(&self) -> StoreResult<()> {
        self.store.remove(SESSION_KEY)
    }
}
