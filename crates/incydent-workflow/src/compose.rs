//! Outgoing message composition.
//!
//! The body layout is a wire-format contract: section order and separators
//! must not change, other tooling parses these messages.

use incydent_core::{PersonalProfile, ReportDraft};

/// Header of the location section.
pub const LOCATION_HEADER: &str = "Lokalizacja:";
/// Header of the reporter-details section.
pub const REPORTER_HEADER: &str = "Dane zgłaszającego:";
/// Prefix of the evidence-folder line.
pub const EVIDENCE_PREFIX: &str = "Dowody: ";

/// Build the report body. Sections in fixed order, separated by one blank
/// line: description; location (with coordinate line when a pin exists);
/// reporter details only for a complete profile; evidence folder reference.
pub fn compose_body(draft: &ReportDraft, profile: Option<&PersonalProfile>) -> String {
    let mut sections: Vec<String> = vec![draft.description.clone()];

    if let Some(location) = &draft.location {
        let mut block = format!("{}\n{}", LOCATION_HEADER, location);
        if let Some(c) = &draft.coordinates {
            block.push_str(&format!("\n({}, {})", c.lat, c.lng));
        }
        sections.push(block);
    }

    if let Some(profile) = profile.filter(|p| p.is_complete()) {
        sections.push(format!(
            "{}\n{}\n{}\n{}",
            REPORTER_HEADER,
            profile.name.trim(),
            profile.phone.trim(),
            profile.address.trim()
        ));
    }

    let folder = draft.evidence_folder_reference.as_deref().unwrap_or("");
    sections.push(format!("{}{}", EVIDENCE_PREFIX, folder));

    sections.join("\n\n")
}
