// SPDX-FileCopyrightText: 2026 Brokerbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reference vocabularies maintained by the office in the spreadsheet.
//!
//! Fetched fresh for every extraction so edits to the lists apply to the
//! next message without a restart.

use brokerbot_core::{BrokerError, Row, TabularStore};
use tracing::debug;

/// Neighborhoods (A), streets (B) and cities (C).
pub const LOCATIONS_RANGE: &str = "Streets!A:C";
pub const UNIT_TYPES_RANGE: &str = "Apt_Types!A:A";
pub const UNIT_CONDITIONS_RANGE: &str = "Apt_Conditions!A:A";

/// Rendered in place of the lists when they cannot be read.
pub const FALLBACK_LISTS: &str = "Error loading lists - using free text input";

/// Marker in the extraction prompt replaced by the rendered lists.
pub const LISTS_PLACEHOLDER: &str = "{DYNAMIC_LISTS_PLACEHOLDER}";

/// One read of the three vocabulary sheets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VocabularySnapshot {
    /// `Streets` rows as stored: `[neighborhood, street, city]`, possibly ragged.
    pub locations: Vec<Row>,
    pub unit_types: Vec<String>,
    pub unit_conditions: Vec<String>,
}

impl VocabularySnapshot {
    pub async fn fetch(store: &dyn TabularStore) -> Result<Self, BrokerError> {
        let locations = store.read_range(LOCATIONS_RANGE).await?;
        let unit_types = store.read_range(UNIT_TYPES_RANGE).await?;
        let unit_conditions = store.read_range(UNIT_CONDITIONS_RANGE).await?;
        debug!(
            locations = locations.len(),
            unit_types = unit_types.len(),
            unit_conditions = unit_conditions.len(),
            "vocabulary loaded"
        );
        Ok(Self {
            locations,
            unit_types: unit_types.into_iter().flatten().collect(),
            unit_conditions: unit_conditions.into_iter().flatten().collect(),
        })
    }

    /// Non-empty entries of one `Streets` column.
    pub fn column(&self, index: usize) -> impl Iterator<Item = &str> {
        self.locations
            .iter()
            .filter_map(move |row| row.get(index))
            .map(String::as_str)
            .filter(|entry| !entry.is_empty())
    }

    /// The lists as they are shown to the model.
    pub fn render(&self) -> String {
        format!(
            "\nרשימת ערים, שכונות ורחובות:\n{}\n\nרשימת סוגי דירות:\n{}\n\nרשימת מצבי דירה:\n{}",
            pretty(&self.locations),
            pretty(&self.unit_types),
            pretty(&self.unit_conditions),
        )
    }
}

fn pretty<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "[]".to_string())
}

/// Substitutes the rendered lists, or the fallback sentence, into `template`.
pub fn render_prompt(template: &str, snapshot: Option<&VocabularySnapshot>) -> String {
    let lists = snapshot.map_or_else(|| FALLBACK_LISTS.to_string(), VocabularySnapshot::render);
    template.replacen(LISTS_PLACEHOLDER, &lists, 1)
}
