// SPDX-FileCopyrightText: 2026 Brokerbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The listing record parsed from a model reply.
//!
//! The model answers with a JSON object keyed by the Hebrew column labels of
//! the Assets sheet. The serde renames below are the label table; any label
//! the model omits, or sets to `null`, becomes an empty string. Numbers and
//! booleans are kept as their JSON text.

use serde::{Deserialize, Deserializer, Serialize};

/// Accepts strings, numbers, booleans and `null` as a cell value.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    })
}

/// One listing as extracted from a group message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedRecord {
    #[serde(rename = "שכונה", default, deserialize_with = "lenient_string")]
    pub neighborhood: String,
    #[serde(rename = "רחוב", default, deserialize_with = "lenient_string")]
    pub street: String,
    #[serde(rename = "עיר", default, deserialize_with = "lenient_string")]
    pub city: String,
    #[serde(rename = "מספר בית", default, deserialize_with = "lenient_string")]
    pub house_number: String,
    #[serde(rename = "סוג הדירה", default, deserialize_with = "lenient_string")]
    pub unit_type: String,
    #[serde(rename = "מספר החדרים", default, deserialize_with = "lenient_string")]
    pub rooms: String,
    #[serde(rename = "גודל בטאבו", default, deserialize_with = "lenient_string")]
    pub registered_size: String,
    #[serde(rename = "גודל בארנונה", default, deserialize_with = "lenient_string")]
    pub municipal_size: String,
    #[serde(rename = "פינת אוכל מוגדרת", default, deserialize_with = "lenient_string")]
    pub dining_area: String,
    #[serde(rename = "מטבע", default, deserialize_with = "lenient_string")]
    pub currency: String,
    #[serde(rename = "מחיר מעודכן 1", default, deserialize_with = "lenient_string")]
    pub price_1: String,
    #[serde(rename = "מחיר מעודכן 2", default, deserialize_with = "lenient_string")]
    pub price_2: String,
    #[serde(rename = "מחיר מעודכן 3", default, deserialize_with = "lenient_string")]
    pub price_3: String,
    #[serde(rename = "מחיר מעודכן 4", default, deserialize_with = "lenient_string")]
    pub price_4: String,
    #[serde(rename = "קומה/מתוך כמה", default, deserialize_with = "lenient_string")]
    pub floor: String,
    #[serde(rename = "נגישות (מפורט)", default, deserialize_with = "lenient_string")]
    pub accessibility_detail: String,
    #[serde(rename = "רמת נגישות", default, deserialize_with = "lenient_string")]
    pub accessibility_level: String,
    #[serde(rename = "מעלית", default, deserialize_with = "lenient_string")]
    pub elevator: String,
    #[serde(rename = "מרפסת 1 (מפורט)", default, deserialize_with = "lenient_string")]
    pub balcony_1: String,
    #[serde(rename = "מרפסת 2 (מפורט)", default, deserialize_with = "lenient_string")]
    pub balcony_2: String,
    #[serde(rename = "מרפסת 3 (מפורט)", default, deserialize_with = "lenient_string")]
    pub balcony_3: String,
    #[serde(rename = "מחסן (מפורט)", default, deserialize_with = "lenient_string")]
    pub storage: String,
    #[serde(rename = "מקלט (מפורט)", default, deserialize_with = "lenient_string")]
    pub shelter: String,
    #[serde(rename = "גינה (מפורט)", default, deserialize_with = "lenient_string")]
    pub garden: String,
    #[serde(rename = "חניה (מפורט)", default, deserialize_with = "lenient_string")]
    pub parking: String,
    #[serde(rename = "מצב הדירה", default, deserialize_with = "lenient_string")]
    pub condition: String,
    #[serde(rename = "פינוי (מתי)", default, deserialize_with = "lenient_string")]
    pub vacate_date: String,
    #[serde(rename = "הערות (פרטי הנכס)", default, deserialize_with = "lenient_string")]
    pub property_notes: String,
    #[serde(rename = "סטטוס", default, deserialize_with = "lenient_string")]
    pub status: String,
    #[serde(rename = "הערות פנימיות", default, deserialize_with = "lenient_string")]
    pub internal_notes: String,
}

impl ExtractedRecord {
    /// Appends notes to the internal notes, one per line.
    pub fn append_internal_notes(&mut self, notes: &[String]) {
        if notes.is_empty() {
            return;
        }
        if !self.internal_notes.is_empty() {
            self.internal_notes.push('\n');
        }
        self.internal_notes.push_str(&notes.join("\n"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_and_null_labels_default_to_empty() {
        let record: ExtractedRecord = serde_json::from_value(serde_json::json!({
            "עיר": "ירושלים",
            "רחוב": null,
            "מספר החדרים": 3.5,
            "מעלית": true,
            "label the sheet does not have": "ignored"
        }))
        .unwrap();
        assert_eq!(record.city, "ירושלים");
        assert_eq!(record.street, "");
        assert_eq!(record.rooms, "3.5");
        assert_eq!(record.elevator, "true");
        assert_eq!(record.internal_notes, "");
        assert_eq!(record.currency, "");
    }

    #[test]
    fn notes_are_appended_line_by_line() {
        let mut record = ExtractedRecord::default();
        record.append_internal_notes(&[]);
        assert_eq!(record.internal_notes, "");

        record.append_internal_notes(&["first".into(), "second".into()]);
        assert_eq!(record.internal_notes, "first\nsecond");

        record.internal_notes = "מתווך בלעדי".into();
        record.append_internal_notes(&["note".into()]);
        assert_eq!(record.internal_notes, "מתווך בלעדי\nnote");
    }
}
