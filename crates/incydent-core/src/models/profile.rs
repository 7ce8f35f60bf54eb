//! Personal profile persisted in the local store.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::constants::PROFILE_KEY;
use crate::store::{LocalStore, StoreResult};

/// Optional personal data appended read-only to the outgoing report body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonalProfile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
}

impl PersonalProfile {
    /// Complete iff all three fields are non-empty after trimming.
    pub fn is_complete(&self) -> bool {
        !self.name.trim().is_empty()
            && !self.phone.trim().is_empty()
            && !self.address.trim().is_empty()
    }
}

/// Profile persistence over the local store, keyed by a fixed name.
#[derive(Clone)]
pub struct ProfileStore {
    store: Arc<dyn LocalStore>,
}

impl ProfileStore {
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        ProfileStore { store }
    }

    /// Load the saved profile. Unparseable entries are treated as absent.
    pub fn load(&self) -> Option<PersonalProfile> {
        let raw = self.store.get(PROFILE_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(profile) => Some(profile),
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unreadable personal profile");
                None
            }
        }
    }

    pub fn save(&self, profile: &PersonalProfile) -> StoreResult<()> {
        let raw = serde_json::to_string(profile).expect("profile serializes");
        self.store.set(PROFILE_KEY, &raw)
    }

    pub fn clear(&self) -> StoreResult<()> {
        self.store.remove(PROFILE_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn completeness_requires_all_fields_trimmed() {
        let mut profile = PersonalProfile {
            name: "Jan Kowalski".into(),
            phone: "+48 600 000 000".into(),
            address: "ul. Długa 1, Gdańsk".into(),
        };
        assert!(profile.is_complete());

        profile.phone = "   ".into();
        assert!(!profile.is_complete());
        assert!(!PersonalProfile::default().is_complete());
    }

    #[test]
    fn store_round_trip_and_clear() {
        let store = ProfileStore::new(Arc::new(MemoryStore::new()));
        assert!(store.load().is_none());

        let profile = PersonalProfile {
            name: "Jan".into(),
            phone: "600".into(),
            address: "Gdańsk".into(),
        };
        store.save(&profile).unwrap();
        assert_eq!(store.load(), Some(profile));

        store.clear().unwrap();
        assert!(store.load().is_none());
    }

    #[test]
    fn corrupt_entry_loads_as_none() {
        let inner = Arc::new(MemoryStore::new());
        inner.set(PROFILE_KEY, "{not json").unwrap();
        let store = ProfileStore::new(inner);
        assert!(store.load().is_none());
    }
}
