//! Batch repair of rows whose cells drifted out of line with the header.
//!
//! A typical cause is a column inserted by hand: every later cell of old rows
//! now sits one column to the right of where the header says it should be.
//! For each row the engine tries the header layout first, then the fixed
//! legacy layout, and rewrites the row into header order when only the legacy
//! reading makes sense.
//!
//! The engine always reads the header fresh and never consults the
//! [`ColumnMapCache`](crate::codec::ColumnMapCache).

pub mod schema;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::codec::{is_blank_row, ColumnMap, RawRecord};
use crate::error::{Result, StorageError};
use crate::store::TabularStore;

pub use schema::{managed_schemas, SheetSchema};

pub const DEFAULT_REPAIR_LIMIT: usize = 1000;
pub const MAX_REPAIR_LIMIT: usize = 5000;

/// Normalise a caller-supplied limit: missing or non-finite → `default`,
/// otherwise floored and clamped to `1..=max`.
pub fn clamp_limit(raw: Option<f64>, default: usize, max: usize) -> usize {
    match raw {
        Some(n) if n.is_finite() => (n.floor().max(1.0) as usize).min(max.max(1)),
        _ => default.clamp(1, max.max(1)),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairOptions {
    /// Write repaired rows back; otherwise only report
    pub apply: bool,
    /// Restrict the run to one sheet
    pub sheet: Option<String>,
    /// Stop a sheet after this many repairs
    pub limit: usize,
}

impl Default for RepairOptions {
    fn default() -> Self {
        Self {
            apply: false,
            sheet: None,
            limit: DEFAULT_REPAIR_LIMIT,
        }
    }
}

/// Per-sheet counts. Blank rows are not counted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetRepairReport {
    pub sheet: String,
    pub scanned: usize,
    pub aligned: usize,
    pub repaired: usize,
    pub skipped: usize,
    /// The limit was hit while rows were still unvisited
    pub limited: bool,
}

impl SheetRepairReport {
    fn empty(sheet: &str) -> Self {
        Self {
            sheet: sheet.to_string(),
            ..Default::default()
        }
    }
}

enum RowVerdict {
    Aligned,
    Repaired(Vec<String>),
    Skipped,
}

/// Classify one data row. Pure.
fn inspect_row(schema: &SheetSchema, map: &ColumnMap, row: &[String]) -> RowVerdict {
    let current = RawRecord::read(row, Some(map), schema.fields).trimmed();
    if schema.is_valid(&current) {
        return RowVerdict::Aligned;
    }

    let legacy = RawRecord::read_legacy(row, schema.fields).trimmed();
    if !schema.is_valid(&legacy) {
        return RowVerdict::Skipped;
    }

    let mut repaired = row.to_vec();
    if repaired.len() < map.width() {
        repaired.resize(map.width(), String::new());
    }
    legacy.write_into(&mut repaired, Some(map));

    // A header missing one of the schema's fields cannot hold the repaired
    // record; re-repairing it on every run would never converge.
    let check = RawRecord::read(&repaired, Some(map), schema.fields).trimmed();
    if schema.is_valid(&check) {
        RowVerdict::Repaired(repaired)
    } else {
        RowVerdict::Skipped
    }
}

pub struct RepairEngine {
    store: Arc<dyn TabularStore>,
    schemas: Vec<SheetSchema>,
}

impl RepairEngine {
    pub fn new(store: Arc<dyn TabularStore>, schemas: Vec<SheetSchema>) -> Self {
        Self { store, schemas }
    }

    pub fn schemas(&self) -> &[SheetSchema] {
        &self.schemas
    }

    fn select(&self, sheet: Option<&str>) -> Result<Vec<&SheetSchema>> {
        let Some(name) = sheet.map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(self.schemas.iter().collect());
        };
        match self.schemas.iter().find(|s| s.sheet == name) {
            Some(schema) => Ok(vec![schema]),
            None => Err(StorageError::UnknownSheet {
                name: name.to_string(),
                expected: self
                    .schemas
                    .iter()
                    .map(|s| s.sheet.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
        }
    }

    /// Run over the selected sheets in schema order.
    pub async fn run(&self, options: &RepairOptions) -> Result<Vec<SheetRepairReport>> {
        let selected = self.select(options.sheet.as_deref())?;
        let limit = options.limit.max(1);

        let mut reports = Vec::with_capacity(selected.len());
        for schema in selected {
            reports.push(self.repair_sheet(schema, options.apply, limit).await?);
        }
        Ok(reports)
    }

    pub async fn repair_sheet(
        &self,
        schema: &SheetSchema,
        apply: bool,
        limit: usize,
    ) -> Result<SheetRepairReport> {
        let rows = self.store.get_all_rows(&schema.sheet).await?;
        let mut report = SheetRepairReport::empty(&schema.sheet);

        let Some(map) = rows.first().and_then(|header| ColumnMap::from_header(header)) else {
            tracing::warn!(sheet = %schema.sheet, "header not found; sheet skipped");
            return Ok(report);
        };

        let data = rows.get(1..).unwrap_or_default();
        for (idx, row) in data.iter().enumerate() {
            if is_blank_row(row) {
                continue;
            }
            if report.repaired >= limit {
                report.limited = true;
                break;
            }

            report.scanned += 1;
            match inspect_row(schema, &map, row) {
                RowVerdict::Aligned => report.aligned += 1,
                RowVerdict::Skipped => {
                    tracing::debug!(sheet = %schema.sheet, row = idx + 2, "row left for manual review");
                    report.skipped += 1;
                }
                RowVerdict::Repaired(fixed) => {
                    report.repaired += 1;
                    if apply {
                        self.store.update_row(&schema.sheet, idx + 2, fixed).await?;
                        tracing::info!(sheet = %schema.sheet, row = idx + 2, "row realigned");
                    }
                }
            }
        }

        tracing::info!(
            sheet = %report.sheet,
            scanned = report.scanned,
            aligned = report.aligned,
            repaired = report.repaired,
            skipped = report.skipped,
            limited = report.limited,
            mode = if apply { "applied" } else { "dry-run" },
            "repair finished"
        );
        Ok(report)
    }
}
