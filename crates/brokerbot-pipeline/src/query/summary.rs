// SPDX-FileCopyrightText: 2026 Brokerbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plain-text descriptions of matched listings for the summarizer.

use brokerbot_core::Row;

use crate::query::filter::row_prices;
use crate::row::{
    cell, COL_CITY, COL_CONDITION, COL_ELEVATOR, COL_FLOOR, COL_HOUSE_NUMBER, COL_NEIGHBORHOOD,
    COL_PROPERTY_NOTES, COL_REGISTERED_SIZE, COL_ROOMS, COL_STREET, COL_UNIT_TYPE,
    COL_VACATE_DATE,
};

/// Whole shekels with thousands separators, e.g. `1,800,000 ₪`.
pub fn format_ils(amount: f64) -> String {
    let rounded = amount.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let sign = if rounded < 0.0 { "-" } else { "" };
    format!("{sign}{grouped} ₪")
}

fn has_elevator(value: &str) -> bool {
    let value = value.trim().to_lowercase();
    !matches!(value.as_str(), "" | "לא" | "אין" | "no" | "false" | "0")
}

/// Six-line description of one Assets row.
pub fn format_property(row: &Row) -> String {
    let prices: Vec<String> = row_prices(row).into_iter().map(format_ils).collect();
    let current = prices.first().map_or("לא צוין", String::as_str);
    let history = if prices.len() > 1 {
        format!("\nהיסטוריית מחירים: {}", prices[1..].join(", "))
    } else {
        String::new()
    };
    let elevator = if has_elevator(cell(row, COL_ELEVATOR)) {
        "יש"
    } else {
        "אין"
    };

    format!(
        "נכס ב{}, {}, {} {}\n\
         סוג: {}, {} חדרים, {} מ\"ר\n\
         קומה: {}, {elevator} מעלית\n\
         מצב: {}, פינוי: {}\n\
         מחיר עדכני: {current}{history}\n\
         הערות: {}",
        cell(row, COL_CITY),
        cell(row, COL_NEIGHBORHOOD),
        cell(row, COL_STREET),
        cell(row, COL_HOUSE_NUMBER),
        cell(row, COL_UNIT_TYPE),
        cell(row, COL_ROOMS),
        cell(row, COL_REGISTERED_SIZE),
        cell(row, COL_FLOOR),
        cell(row, COL_CONDITION),
        cell(row, COL_VACATE_DATE),
        cell(row, COL_PROPERTY_NOTES),
    )
}

/// Descriptions of the first `limit` rows, separated by blank lines.
pub fn short_list(rows: &[Row], limit: usize) -> String {
    rows.iter()
        .take(limit)
        .map(format_property)
        .collect::<Vec<_>>()
        .join("\n\n")
}
