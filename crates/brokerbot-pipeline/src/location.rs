// SPDX-FileCopyrightText: 2026 Brokerbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Location validation against the `Streets` vocabulary.
//!
//! Validation never rejects a listing and never rewrites the extracted
//! value; an unknown location only produces a note asking the office to add
//! it to the list.

use strum::{Display, EnumIter};

use crate::record::ExtractedRecord;
use crate::vocabulary::VocabularySnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum LocationKind {
    Neighborhood,
    Street,
    City,
}

impl LocationKind {
    /// Hebrew label used in notes.
    pub fn label(self) -> &'static str {
        match self {
            Self::Neighborhood => "שכונה",
            Self::Street => "רחוב",
            Self::City => "עיר",
        }
    }

    /// Column of the `Streets` sheet holding this kind.
    pub fn column(self) -> usize {
        match self {
            Self::Neighborhood => 0,
            Self::Street => 1,
            Self::City => 2,
        }
    }

    /// The extracted value of this kind.
    pub fn value(self, record: &ExtractedRecord) -> &str {
        match self {
            Self::Neighborhood => &record.neighborhood,
            Self::Street => &record.street,
            Self::City => &record.city,
        }
    }
}

/// Trims and drops a leading `ב` ("in"), then a leading `ה` ("the").
pub fn clean_location(raw: &str) -> &str {
    let value = raw.trim();
    let value = value.strip_prefix('ב').unwrap_or(value);
    let value = value.strip_prefix('ה').unwrap_or(value);
    value.trim()
}

fn same_location(a: &str, b: &str) -> bool {
    clean_location(a).to_lowercase() == clean_location(b).to_lowercase()
}

/// Returns the "new location" note when `value` is not in the vocabulary.
pub fn location_note(
    kind: LocationKind,
    value: &str,
    vocabulary: &VocabularySnapshot,
) -> Option<String> {
    let known = vocabulary
        .column(kind.column())
        .any(|entry| same_location(entry, value));
    if known {
        return None;
    }
    Some(format!(
        "נמצא/ה {} חדש/ה: {}. יש להוסיף ידנית לרשימה.",
        kind.label(),
        clean_location(value)
    ))
}

/// Note recorded when the vocabulary could not be read.
pub fn validation_error_note(kind: LocationKind, error: &str) -> String {
    format!("שגיאה באימות {}: {error}", kind.label())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocabulary() -> VocabularySnapshot {
        VocabularySnapshot {
            locations: vec![
                vec!["רחביה".into(), "עזה".into(), "Jerusalem".into()],
                vec!["".into(), "הרצל".into()],
            ],
            ..Default::default()
        }
    }

    #[test]
    fn prefixes_are_stripped_in_order() {
        assert_eq!(clean_location("  ברחביה "), "רחביה");
        assert_eq!(clean_location("הגפן"), "גפן");
        assert_eq!(clean_location("בהגפן"), "גפן");
        assert_eq!(clean_location("ה"), "");
        assert_eq!(clean_location("Tel Aviv"), "Tel Aviv");
    }

    #[test]
    fn known_location_has_no_note() {
        let vocab = vocabulary();
        assert_eq!(location_note(LocationKind::Neighborhood, "ברחביה", &vocab), None);
        assert_eq!(location_note(LocationKind::City, "jerusalem", &vocab), None);
        assert_eq!(location_note(LocationKind::Street, "הרצל", &vocab), None);
    }

    #[test]
    fn unknown_location_gets_one_note_with_cleaned_value() {
        let vocab = vocabulary();
        let note = location_note(LocationKind::Neighborhood, "בקטמון", &vocab).unwrap();
        assert_eq!(note, "נמצא/ה שכונה חדש/ה: קטמון. יש להוסיף ידנית לרשימה.");

        // Values only match within their own column.
        let note = location_note(LocationKind::Street, "רחביה", &vocab).unwrap();
        assert!(note.starts_with("נמצא/ה רחוב חדש/ה"));
    }

    #[test]
    fn error_note_names_the_kind() {
        assert_eq!(
            validation_error_note(LocationKind::City, "store error: quota exceeded"),
            "שגיאה באימות עיר: store error: quota exceeded"
        );
    }
}
