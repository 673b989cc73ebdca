// SPDX-FileCopyrightText: 2026 Brokerbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Asset id allocation and realtor lookup.

use brokerbot_core::{Row, TabularStore};
use tracing::warn;

use crate::row::ASSET_ID_RANGE;

/// Name (A) and phone (B) of every known realtor.
pub const REALTORS_RANGE: &str = "Realtors!A:B";

/// Id used when the id column is empty or unreadable.
pub const FIRST_ASSET_ID: &str = "0001";

/// Numeric value of an id cell; headers and other text are skipped.
fn parse_id(cell: &str) -> Option<u64> {
    let digits: String = cell
        .trim()
        .trim_start_matches('0')
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

/// Max + 1 over the id column, zero-padded to four digits.
///
/// A column whose maximum cannot be incremented restarts at `0001`.
pub fn next_asset_id(rows: &[Row]) -> String {
    let Some(max) = rows.iter().flatten().filter_map(|cell| parse_id(cell)).max() else {
        return FIRST_ASSET_ID.to_string();
    };
    match max.checked_add(1) {
        Some(next) => format!("{next:04}"),
        None => {
            warn!(max, "asset id column is exhausted, falling back to {FIRST_ASSET_ID}");
            FIRST_ASSET_ID.to_string()
        }
    }
}

/// Reads the id column and allocates the next id.
///
/// Callers must serialize allocation with the append that uses the id.
pub async fn allocate_asset_id(store: &dyn TabularStore) -> String {
    match store.read_range(ASSET_ID_RANGE).await {
        Ok(rows) => next_asset_id(&rows),
        Err(e) => {
            warn!(error = %e, "failed to read asset ids, falling back to {FIRST_ASSET_ID}");
            FIRST_ASSET_ID.to_string()
        }
    }
}

/// Name of the realtor registered with exactly this phone, or empty.
pub async fn realtor_name(store: &dyn TabularStore, phone: &str) -> String {
    match store.read_range(REALTORS_RANGE).await {
        Ok(rows) => rows
            .into_iter()
            .find(|row| row.get(1).is_some_and(|p| p == phone))
            .and_then(|row| row.into_iter().next())
            .unwrap_or_default(),
        Err(e) => {
            warn!(error = %e, %phone, "realtor lookup failed");
            String::new()
        }
    }
}
