// SPDX-FileCopyrightText: 2026 Brokerbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory spreadsheet implementing `TabularStore`.
//!
//! Understands the A1 ranges brokerbot uses (`Assets!A:A`, `Assets!A2:AI`,
//! `Realtors!A:B`, `Assets!A2`), trims trailing empty cells on read like the
//! Sheets API, and supports failure injection per sheet.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use brokerbot_core::{AdapterType, BrokerError, HealthStatus, PluginAdapter, Row, TabularStore};

/// A parsed A1 range. Rows and columns are zero-based; `None` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Bounds {
    first_row: usize,
    last_row: Option<usize>,
    first_col: usize,
    last_col: usize,
}

#[derive(Debug, Default)]
struct Inner {
    sheets: HashMap<String, Vec<Row>>,
    failing_reads: HashSet<String>,
    fail_appends: bool,
    reads: Vec<String>,
}

/// An in-memory spreadsheet.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    read_delay: Mutex<Option<Duration>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a sheet with rows (row 1 first).
    pub fn with_sheet<R, C>(self, name: &str, rows: R) -> Self
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        let rows: Vec<Row> = rows
            .into_iter()
            .map(|r| r.into_iter().map(Into::into).collect())
            .collect();
        if let Ok(mut inner) = self.inner.lock() {
            inner.sheets.insert(name.to_string(), rows);
        }
        self
    }

    /// Make every read of `sheet` fail.
    pub fn fail_reads_of(&self, sheet: &str) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.failing_reads.insert(sheet.to_string());
        }
    }

    /// Make every append fail.
    pub fn fail_appends(&self, fail: bool) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.fail_appends = fail;
        }
    }

    /// Delay every read, widening read-then-write windows in concurrency tests.
    pub fn set_read_delay(&self, delay: Duration) {
        if let Ok(mut d) = self.read_delay.lock() {
            *d = Some(delay);
        }
    }

    /// Full content of a sheet.
    pub fn sheet(&self, name: &str) -> Vec<Row> {
        self.inner
            .lock()
            .ok()
            .and_then(|inner| inner.sheets.get(name).cloned())
            .unwrap_or_default()
    }

    /// Ranges read so far, in order.
    pub fn reads(&self) -> Vec<String> {
        self.inner
            .lock()
            .map(|inner| inner.reads.clone())
            .unwrap_or_default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, BrokerError> {
        self.inner
            .lock()
            .map_err(|_| BrokerError::Internal("memory store poisoned".into()))
    }
}

fn split_range(range: &str) -> Result<(&str, Bounds), BrokerError> {
    let (sheet, cells) = range
        .split_once('!')
        .ok_or_else(|| BrokerError::store(format!("range `{range}` has no sheet name")))?;
    let (start, end) = match cells.split_once(':') {
        Some((s, e)) => (s, Some(e)),
        None => (cells, None),
    };
    let (first_col, first_row) = parse_cell(start)
        .ok_or_else(|| BrokerError::store(format!("invalid range `{range}`")))?;
    let (last_col, last_row) = match end {
        Some(e) => parse_cell(e).ok_or_else(|| BrokerError::store(format!("invalid range `{range}`")))?,
        None => (first_col, None),
    };
    Ok((
        sheet,
        Bounds {
            first_row: first_row.unwrap_or(0),
            last_row,
            first_col,
            last_col,
        },
    ))
}

/// Parses `AI12` into (column 34, Some(row 11)); `AI` into (34, None).
fn parse_cell(cell: &str) -> Option<(usize, Option<usize>)> {
    let split = cell.find(|c: char| c.is_ascii_digit()).unwrap_or(cell.len());
    let (letters, digits) = cell.split_at(split);
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_uppercase()) {
        return None;
    }
    let col = letters
        .bytes()
        .fold(0usize, |acc, b| acc * 26 + usize::from(b - b'A' + 1))
        - 1;
    let row = if digits.is_empty() {
        None
    } else {
        Some(digits.parse::<usize>().ok()?.checked_sub(1)?)
    };
    Some((col, row))
}

fn trim_row(mut row: Row) -> Row {
    while row.last().is_some_and(|c| c.is_empty()) {
        row.pop();
    }
    row
}

#[async_trait]
impl PluginAdapter for MemoryStore {
    fn name(&self) -> &str {
        "memory-store"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Store
    }

    async fn health_check(&self) -> Result<HealthStatus, BrokerError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), BrokerError> {
        Ok(())
    }
}

#[async_trait]
impl TabularStore for MemoryStore {
    async fn read_range(&self, range: &str) -> Result<Vec<Row>, BrokerError> {
        let delay = self.read_delay.lock().ok().and_then(|d| *d);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let (sheet, bounds) = split_range(range)?;
        let mut inner = self.lock()?;
        inner.reads.push(range.to_string());
        if inner.failing_reads.contains(sheet) {
            return Err(BrokerError::store(format!("read of `{range}` failed")));
        }
        let rows = inner.sheets.get(sheet).cloned().unwrap_or_default();

        let mut out: Vec<Row> = rows
            .into_iter()
            .enumerate()
            .filter(|(i, _)| *i >= bounds.first_row && bounds.last_row.is_none_or(|last| *i <= last))
            .map(|(_, row)| {
                let cells = row
                    .into_iter()
                    .skip(bounds.first_col)
                    .take(bounds.last_col + 1 - bounds.first_col)
                    .collect();
                trim_row(cells)
            })
            .collect();
        while out.last().is_some_and(Vec::is_empty) {
            out.pop();
        }
        Ok(out)
    }

    async fn append_row(&self, range: &str, row: Row) -> Result<(), BrokerError> {
        let (sheet, _) = split_range(range)?;
        let mut inner = self.lock()?;
        if inner.fail_appends {
            return Err(BrokerError::store("append failed"));
        }
        inner.sheets.entry(sheet.to_string()).or_default().push(row);
        Ok(())
    }

    async fn update_range(&self, range: &str, rows: Vec<Row>) -> Result<(), BrokerError> {
        let (sheet, bounds) = split_range(range)?;
        let mut inner = self.lock()?;
        let table = inner.sheets.entry(sheet.to_string()).or_default();
        for (offset, values) in rows.into_iter().enumerate() {
            let index = bounds.first_row + offset;
            if table.len() <= index {
                table.resize(index + 1, Vec::new());
            }
            let target = &mut table[index];
            for (c, value) in values.into_iter().enumerate() {
                let col = bounds.first_col + c;
                if target.len() <= col {
                    target.resize(col + 1, String::new());
                }
                target[col] = value;
            }
        }
        Ok(())
    }
}
