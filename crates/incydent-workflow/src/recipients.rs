//! Recipient selection: validated, duplicate-free address list, the static
//! directory, and the persisted autocomplete history.

use std::sync::Arc;

use incydent_core::constants::RECIPIENT_HISTORY_KEY;
use incydent_core::store::{LocalStore, StoreResult};
use incydent_core::validation::is_valid_email;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecipientError {
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),
}

/// Ordered set of validated recipient addresses (insertion order, no
/// duplicates).
#[derive(Debug, Default, Clone)]
pub struct RecipientList {
    entries: Vec<String>,
}

impl RecipientList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an address. Returns `Ok(false)` for a duplicate (selection
    /// unchanged), `Err` for invalid syntax.
    pub fn add(&mut self, address: &str) -> Result<bool, RecipientError> {
        let address = address.trim();
        if !is_valid_email(address) {
            return Err(RecipientError::InvalidEmail(address.to_string()));
        }
        if self.entries.iter().any(|e| e.eq_ignore_ascii_case(address)) {
            return Ok(false);
        }
        self.entries.push(address.to_string());
        Ok(true)
    }

    pub fn remove(&mut self, address: &str) -> bool {
        let before = self.entries.len();
        self.entries
            .retain(|e| !e.eq_ignore_ascii_case(address.trim()));
        self.entries.len() != before
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn addresses(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Static directory entry: a known institution and its intake address.
#[derive(Debug, Clone, Copy)]
pub struct DirectoryEntry {
    pub name: &'static str,
    pub email: &'static str,
}

/// Institutions offered on the recipient screen.
pub const RECIPIENT_DIRECTORY: &[DirectoryEntry] = &[
    DirectoryEntry {
        name: "Komenda Stołeczna Policji",
        email: "dyzurny.ksp@policja.gov.pl",
    },
    DirectoryEntry {
        name: "Komenda Wojewódzka Policji w Gdańsku",
        email: "dyzurny.kwp@gd.policja.gov.pl",
    },
    DirectoryEntry {
        name: "Komenda Wojewódzka Policji w Krakowie",
        email: "dyzurny.kwp@malopolska.policja.gov.pl",
    },
    DirectoryEntry {
        name: "Straż Miejska m.st. Warszawy",
        email: "zgloszenia@strazmiejska.waw.pl",
    },
];

/// Capped, deduplicated most-recent-first history of free-text recipient
/// entries; only used for autocomplete suggestions.
#[derive(Clone)]
pub struct RecipientHistory {
    store: Arc<dyn LocalStore>,
    cap: usize,
}

impl RecipientHistory {
    pub fn new(store: Arc<dyn LocalStore>, cap: usize) -> Self {
        RecipientHistory { store, cap }
    }

    pub fn load(&self) -> Vec<String> {
        let Some(raw) = self.store.get(RECIPIENT_HISTORY_KEY) else {
            return Vec::new();
        };
        serde_json::from_str(&raw).unwrap_or_default()
    }

    /// Record one entry at the front, deduplicating and enforcing the cap.
    pub fn remember(&self, address: &str) -> StoreResult<()> {
        let address = address.trim();
        let mut history = self.load();
        history.retain(|e| !e.eq_ignore_ascii_case(address));
        history.insert(0, address.to_string());
        history.truncate(self.cap);
        let raw = serde_json::to_string(&history).expect("history serializes");
        self.store.set(RECIPIENT_HISTORY_KEY, &raw)
    }

    /// Case-insensitive prefix suggestions.
    pub fn suggestions(&self, prefix: &str) -> Vec<String> {
        let prefix = prefix.trim().to_ascii_lowercase();
        self.load()
            .into_iter()
            .filter(|e| e.to_ascii_lowercase().starts_with(&prefix))
            .collect()
    }
}
