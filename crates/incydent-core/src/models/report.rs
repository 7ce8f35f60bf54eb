//! Report draft accumulated across the workflow screens.

use serde::{Deserialize, Serialize};

/// Geographic coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// User input gathered on screens 1–3, consumed read-only at the send step.
#[derive(Debug, Clone, Default)]
pub struct ReportDraft {
    pub title: String,
    pub description: String,
    pub location: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub evidence_folder_reference: Option<String>,
}

impl ReportDraft {
    /// Update address and coordinates together; they are never set
    /// independently, so a displayed address always matches its pin.
    pub fn set_location(&mut self, address: String, coordinates: Option<Coordinates>) {
        self.location = Some(address);
        self.coordinates = coordinates;
    }

    pub fn reset(&mut self) {
        *self = ReportDraft::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_location_replaces_both_fields() {
        let mut draft = ReportDraft::default();
        draft.set_location(
            "Rynek 1, Wrocław".to_string(),
            Some(Coordinates { lat: 51.11, lng: 17.03 }),
        );
        draft.set_location("Lokalizacja spoza mapy".to_string(), None);
        assert_eq!(draft.location.as_deref(), Some("Lokalizacja spoza mapy"));
        assert!(draft.coordinates.is_none());
    }

    #[test]
    fn reset_restores_initial_values() {
        let mut draft = ReportDraft {
            title: "T".into(),
            description: "D".into(),
            location: Some("L".into()),
            coordinates: Some(Coordinates { lat: 1.0, lng: 2.0 }),
            evidence_folder_reference: Some("F".into()),
        };
        draft.reset();
        assert!(draft.title.is_empty());
        assert!(draft.description.is_empty());
        assert!(draft.location.is_none());
        assert!(draft.coordinates.is_none());
        assert!(draft.evidence_folder_reference.is_none());
    }
}
