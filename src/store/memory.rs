//! In-process [`TabularStore`] used by tests and `--memory` CLI runs.
//!
//! Mirrors the Sheets behaviours the core depends on: appends go after the
//! last row, updates past the end grow the sheet, and reads return ragged
//! rows exactly as stored.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use super::TabularStore;
use crate::error::{Result, StorageError};

#[derive(Debug, Default)]
pub struct MemoryStore {
    sheets: RwLock<HashMap<String, Vec<Vec<String>>>>,
    writes: AtomicUsize,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style helper that seeds a sheet from string slices.
    pub fn with_sheet(self, name: &str, rows: &[&[&str]]) -> Self {
        self.insert_sheet(
            name,
            rows.iter()
                .map(|row| row.iter().map(|cell| cell.to_string()).collect())
                .collect(),
        );
        self
    }

    /// Replace (or create) a sheet wholesale. Not counted as a write.
    pub fn insert_sheet(&self, name: &str, rows: Vec<Vec<String>>) {
        self.sheets.write().insert(name.to_string(), rows);
    }

    /// Snapshot of a sheet's rows.
    pub fn rows(&self, name: &str) -> Vec<Vec<String>> {
        self.sheets.read().get(name).cloned().unwrap_or_default()
    }

    /// Number of append/update calls that reached the store.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Make every subsequent write fail with a backend error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn begin_write(&self, sheet: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Backend(format!(
                "write to {} rejected (simulated outage)",
                sheet
            )));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn missing_sheet(sheet: &str) -> StorageError {
    StorageError::Backend(format!("Unable to parse range: {}", sheet))
}

fn set_cell(rows: &mut Vec<Vec<String>>, row: usize, column: usize, value: String) {
    while rows.len() < row {
        rows.push(Vec::new());
    }
    let cells = &mut rows[row - 1];
    while cells.len() < column {
        cells.push(String::new());
    }
    cells[column - 1] = value;
}

#[async_trait]
impl TabularStore for MemoryStore {
    async fn append_row(&self, sheet: &str, row: Vec<String>) -> Result<()> {
        self.begin_write(sheet)?;
        let mut sheets = self.sheets.write();
        let rows = sheets.get_mut(sheet).ok_or_else(|| missing_sheet(sheet))?;
        rows.push(row);
        Ok(())
    }

    async fn get_all_rows(&self, sheet: &str) -> Result<Vec<Vec<String>>> {
        self.sheets
            .read()
            .get(sheet)
            .cloned()
            .ok_or_else(|| missing_sheet(sheet))
    }

    async fn update_cell(
        &self,
        sheet: &str,
        row: usize,
        column: usize,
        value: &str,
    ) -> Result<()> {
        if row < 1 || column < 1 {
            return Err(StorageError::Backend(format!(
                "invalid cell address {}:{}",
                row, column
            )));
        }
        self.begin_write(sheet)?;
        let mut sheets = self.sheets.write();
        let rows = sheets.get_mut(sheet).ok_or_else(|| missing_sheet(sheet))?;
        set_cell(rows, row, column, value.to_string());
        Ok(())
    }

    async fn update_row(&self, sheet: &str, row: usize, values: Vec<String>) -> Result<()> {
        if row < 1 {
            return Err(StorageError::Backend(format!("invalid row index {}", row)));
        }
        self.begin_write(sheet)?;
        let mut sheets = self.sheets.write();
        let rows = sheets.get_mut(sheet).ok_or_else(|| missing_sheet(sheet))?;
        for (idx, value) in values.into_iter().enumerate() {
            set_cell(rows, row, idx + 1, value);
        }
        Ok(())
    }
}
