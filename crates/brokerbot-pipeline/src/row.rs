// SPDX-FileCopyrightText: 2026 Brokerbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Positional layout of the Assets sheet (columns A..AI).

use brokerbot_core::Row;

use crate::record::ExtractedRecord;

/// Column of asset ids, scanned to allocate the next id.
pub const ASSET_ID_RANGE: &str = "Assets!A:A";
/// Anchor of appended listing rows (row 1 holds the headers).
pub const APPEND_RANGE: &str = "Assets!A2";
/// Every listing row, headers excluded.
pub const DATA_RANGE: &str = "Assets!A2:AI";

pub const COLUMN_COUNT: usize = 35;

pub const COL_ASSET_ID: usize = 0;
pub const COL_REALTOR: usize = 1;
pub const COL_PHONE: usize = 2;
pub const COL_NEIGHBORHOOD: usize = 3;
pub const COL_STREET: usize = 4;
pub const COL_CITY: usize = 5;
pub const COL_HOUSE_NUMBER: usize = 6;
pub const COL_UNIT_TYPE: usize = 7;
pub const COL_ROOMS: usize = 8;
pub const COL_REGISTERED_SIZE: usize = 9;
/// Price columns N..Q, oldest first.
pub const COL_PRICES: [usize; 4] = [13, 14, 15, 16];
pub const COL_FLOOR: usize = 17;
pub const COL_ELEVATOR: usize = 20;
pub const COL_CONDITION: usize = 28;
pub const COL_VACATE_DATE: usize = 29;
pub const COL_PROPERTY_NOTES: usize = 30;
pub const COL_TIMESTAMP: usize = 31;
pub const COL_GROUP_NAME: usize = 32;
pub const COL_STATUS: usize = 33;
pub const COL_INTERNAL_NOTES: usize = 34;

pub const DEFAULT_CURRENCY: &str = "ש\"ח";
pub const DEFAULT_STATUS: &str = "פעיל";

/// A finished listing waiting for its asset id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRow {
    pub record: ExtractedRecord,
    pub realtor_name: String,
    pub phone: String,
    /// `dd/mm/yyyy HH:MM` in local time.
    pub timestamp: String,
    pub group_name: String,
}

fn or_default(value: String, default: &str) -> String {
    if value.is_empty() {
        default.to_string()
    } else {
        value
    }
}

impl ListingRow {
    /// Lays the listing out as an Assets row.
    pub fn into_row(self, asset_id: &str) -> Row {
        let r = self.record;
        let row = vec![
            asset_id.to_string(),
            self.realtor_name,
            self.phone,
            r.neighborhood,
            r.street,
            r.city,
            r.house_number,
            r.unit_type,
            r.rooms,
            r.registered_size,
            r.municipal_size,
            r.dining_area,
            or_default(r.currency, DEFAULT_CURRENCY),
            r.price_1,
            r.price_2,
            r.price_3,
            r.price_4,
            r.floor,
            r.accessibility_detail,
            r.accessibility_level,
            r.elevator,
            r.balcony_1,
            r.balcony_2,
            r.balcony_3,
            r.storage,
            r.shelter,
            r.garden,
            r.parking,
            r.condition,
            r.vacate_date,
            r.property_notes,
            self.timestamp,
            self.group_name,
            or_default(r.status, DEFAULT_STATUS),
            r.internal_notes,
        ];
        debug_assert_eq!(row.len(), COLUMN_COUNT);
        row
    }
}

/// Cell `index` of a row read back from the sheet, empty when trimmed away.
pub fn cell(row: &Row, index: usize) -> &str {
    row.get(index).map(String::as_str).unwrap_or_default()
}
