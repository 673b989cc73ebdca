// SPDX-FileCopyrightText: 2026 Brokerbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Filter criteria and matching over Assets rows.

use brokerbot_core::{BrokerError, Row, TabularStore};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::row::{
    cell, COL_CITY, COL_NEIGHBORHOOD, COL_PRICES, COL_REGISTERED_SIZE, COL_ROOMS, COL_STATUS,
    COL_STREET, COL_UNIT_TYPE, DATA_RANGE,
};

/// Status text of listings still on the market.
pub const ACTIVE_STATUS: &str = "פעיל";

/// Search criteria interpreted from a question.
///
/// Every criterion is optional and matched independently; a listing matches
/// when all present criteria match. Empty strings and zero bounds count as
/// absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterPredicate {
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub neighborhood: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub property_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub min_rooms: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub max_rooms: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub min_size: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub max_size: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub min_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub max_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub include_sold: bool,
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => parse_number(&s),
        _ => None,
    })
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Bool(b) => b,
        serde_json::Value::String(s) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    })
}

/// Leading number of a cell such as `3.5`, `120 מ"ר` or `1,800,000`.
///
/// Thousands separators are ignored; text without a leading number is
/// `None`.
pub fn parse_number(text: &str) -> Option<f64> {
    let cleaned: String = text.trim().chars().filter(|c| *c != ',').collect();
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;
    for (i, c) in cleaned.char_indices() {
        match c {
            '0'..='9' => seen_digit = true,
            '.' if !seen_dot => seen_dot = true,
            '-' | '+' if i == 0 => {}
            _ => break,
        }
        end = i + c.len_utf8();
    }
    if !seen_digit {
        return None;
    }
    cleaned[..end].parse().ok()
}

/// A bound that is present and non-zero.
fn bound(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v != 0.0)
}

fn text_matches(criterion: Option<&str>, value: &str) -> bool {
    match criterion.map(str::trim).filter(|c| !c.is_empty()) {
        Some(criterion) => value.to_lowercase().contains(&criterion.to_lowercase()),
        None => true,
    }
}

fn in_range(value: f64, min: Option<f64>, max: Option<f64>) -> bool {
    bound(min).is_none_or(|min| value >= min) && bound(max).is_none_or(|max| value <= max)
}

/// Positive prices of a row, oldest first.
pub fn row_prices(row: &Row) -> Vec<f64> {
    COL_PRICES
        .iter()
        .filter_map(|&col| parse_number(cell(row, col)))
        .filter(|price| *price > 0.0)
        .collect()
}

impl FilterPredicate {
    /// Whether one Assets row satisfies every present criterion.
    pub fn matches(&self, row: &Row) -> bool {
        let number = |col| parse_number(cell(row, col)).unwrap_or(0.0);

        let prices = row_prices(row);
        let min_price = bound(self.min_price).unwrap_or(0.0);
        let max_price = bound(self.max_price).unwrap_or(f64::INFINITY);
        let price_matches =
            prices.is_empty() || prices.iter().any(|p| *p >= min_price && *p <= max_price);

        let status_matches =
            self.include_sold || cell(row, COL_STATUS).to_lowercase().contains(ACTIVE_STATUS);

        text_matches(self.city.as_deref(), cell(row, COL_CITY))
            && text_matches(self.neighborhood.as_deref(), cell(row, COL_NEIGHBORHOOD))
            && text_matches(self.street.as_deref(), cell(row, COL_STREET))
            && text_matches(self.property_type.as_deref(), cell(row, COL_UNIT_TYPE))
            && in_range(number(COL_ROOMS), self.min_rooms, self.max_rooms)
            && in_range(number(COL_REGISTERED_SIZE), self.min_size, self.max_size)
            && price_matches
            && status_matches
    }
}

/// The rows matching `predicate`, in sheet order.
pub fn filter_rows(rows: &[Row], predicate: &FilterPredicate) -> Vec<Row> {
    rows.iter().filter(|row| predicate.matches(row)).cloned().collect()
}

/// Reads every listing and keeps the ones matching `predicate`.
pub async fn filter_properties(
    store: &dyn TabularStore,
    predicate: &FilterPredicate,
) -> Result<Vec<Row>, BrokerError> {
    let rows = store.read_range(DATA_RANGE).await?;
    let matches = filter_rows(&rows, predicate);
    debug!(total = rows.len(), matched = matches.len(), "listings filtered");
    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::COLUMN_COUNT;
    use proptest::prelude::*;

    fn listing(city: &str, rooms: &str, prices: &[&str], status: &str) -> Row {
        let mut row = vec![String::new(); COLUMN_COUNT];
        row[COL_CITY] = city.into();
        row[COL_ROOMS] = rooms.into();
        for (col, price) in COL_PRICES.iter().zip(prices) {
            row[*col] = price.to_string();
        }
        row[COL_STATUS] = status.into();
        row
    }

    fn predicate(json: serde_json::Value) -> FilterPredicate {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn rooms_and_price_bounds() {
        let p = predicate(serde_json::json!({"minRooms": 3, "maxPrice": 2000000}));
        assert!(p.matches(&listing("ירושלים", "3", &["1800000"], "פעיל")));
        assert!(!p.matches(&listing("ירושלים", "3", &["2500000"], "פעיל")));
        assert!(!p.matches(&listing("ירושלים", "2.5", &["1800000"], "פעיל")));
    }

    #[test]
    fn any_price_in_history_may_match() {
        let p = predicate(serde_json::json!({"minPrice": 1000000, "maxPrice": 2000000}));
        assert!(p.matches(&listing("", "", &["2500000", "0", "1950000"], "פעיל")));
        assert!(!p.matches(&listing("", "", &["2500000", "2100000"], "פעיל")));
        // Listings without a price are never excluded by price.
        assert!(p.matches(&listing("", "", &["", "-5"], "פעיל")));
    }

    #[test]
    fn sold_listings_need_include_sold() {
        let sold = listing("חיפה", "4", &[], "נמכר");
        assert!(!FilterPredicate::default().matches(&sold));
        let p = predicate(serde_json::json!({"includeSold": true}));
        assert!(p.matches(&sold));
        assert!(!FilterPredicate::default().matches(&vec!["0001".to_string()]));
    }

    #[test]
    fn text_criteria_are_case_insensitive_substrings() {
        let p = predicate(serde_json::json!({"city": "tel"}));
        assert!(p.matches(&listing("Tel Aviv", "", &[], "פעיל")));
        assert!(!p.matches(&listing("Haifa", "", &[], "פעיל")));
    }

    #[test]
    fn lenient_fields() {
        let p = predicate(serde_json::json!({
            "city": "",
            "minRooms": "3.5",
            "maxRooms": 0,
            "maxPrice": null,
            "includeSold": "true",
            "bedrooms": 2
        }));
        assert_eq!(p.city, None);
        assert_eq!(p.min_rooms, Some(3.5));
        assert_eq!(p.max_rooms, Some(0.0));
        assert_eq!(p.max_price, None);
        assert!(p.include_sold);
        // A zero bound is no bound.
        assert!(p.matches(&listing("", "5", &[], "")));
    }

    #[test]
    fn numbers_are_read_from_cell_prefixes() {
        assert_eq!(parse_number("3.5"), Some(3.5));
        assert_eq!(parse_number(" 120 מ\"ר"), Some(120.0));
        assert_eq!(parse_number("1,800,000"), Some(1_800_000.0));
        assert_eq!(parse_number("-3"), Some(-3.0));
        assert_eq!(parse_number("קומה 3"), None);
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("."), None);
    }

    #[test]
    fn serialized_predicate_omits_absent_criteria() {
        let p = predicate(serde_json::json!({"city": "חיפה", "maxPrice": 2000000}));
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"city": "חיפה", "maxPrice": 2000000.0, "includeSold": false})
        );
    }

    fn arb_row() -> impl Strategy<Value = Row> {
        (
            prop::sample::select(vec!["ירושלים", "Tel Aviv", "חיפה", ""]),
            prop::sample::select(vec!["", "2", "3", "4.5", "x"]),
            prop::collection::vec(prop::sample::select(vec!["", "0", "1500000", "2500000"]), 0..4),
            prop::sample::select(vec!["פעיל", "נמכר", ""]),
        )
            .prop_map(|(city, rooms, prices, status)| listing(city, rooms, &prices, status))
    }

    fn arb_predicate() -> impl Strategy<Value = FilterPredicate> {
        (
            prop::option::of(prop::sample::select(vec!["ירו", "tel", "חיפה"])),
            prop::option::of(0.0f64..6.0),
            prop::option::of(0.0f64..3_000_000.0),
            any::<bool>(),
        )
            .prop_map(|(city, min_rooms, max_price, include_sold)| FilterPredicate {
                city: city.map(str::to_string),
                min_rooms,
                max_price,
                include_sold,
                ..Default::default()
            })
    }

    proptest! {
        #[test]
        fn filtering_is_idempotent(
            rows in prop::collection::vec(arb_row(), 0..30),
            predicate in arb_predicate(),
        ) {
            let once = filter_rows(&rows, &predicate);
            prop_assert_eq!(&filter_rows(&rows, &predicate), &once);
            prop_assert_eq!(&filter_rows(&once, &predicate), &once);
            // Matches keep their relative sheet order.
            let mut cursor = rows.iter();
            for matched in &once {
                prop_assert!(cursor.any(|row| row == matched));
            }
        }
    }
}
