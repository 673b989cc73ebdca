// SPDX-FileCopyrightText: 2026 Brokerbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tabular store trait (spreadsheet-like backends).

use async_trait::async_trait;

use crate::error::BrokerError;
use crate::traits::adapter::PluginAdapter;
use crate::types::Row;

/// A spreadsheet addressed with A1 ranges such as `Assets!A2:AI`.
///
/// Implementations are bound to one spreadsheet at construction time.
/// Reads return rows with trailing empty cells trimmed, the same way the
/// Sheets API does.
#[async_trait]
pub trait TabularStore: PluginAdapter {
    /// Reads every row inside `range`.
    async fn read_range(&self, range: &str) -> Result<Vec<Row>, BrokerError>;

    /// Appends one row after the last row of the table anchored at `range`.
    async fn append_row(&self, range: &str, row: Row) -> Result<(), BrokerError>;

    /// Overwrites the cells starting at `range` with `rows`.
    async fn update_range(&self, range: &str, rows: Vec<Row>) -> Result<(), BrokerError>;
}
