//! Row codec: maps logical record fields onto spreadsheet columns.
//!
//! Sheets are edited by hand, so column order cannot be trusted. Each field
//! declares the header spellings it answers to plus a legacy position. Reads
//! and writes go through a two-tier lookup:
//!
//! 1. **Header lookup** - the sheet's header row is normalised into a
//!    [`ColumnMap`]; the first alias that matches wins.
//! 2. **Legacy fallback** - when the sheet has no usable header (or, for
//!    reads, the header lacks every alias) the field's fixed positional index
//!    is used instead.
//!
//! Writes never truncate: a row is grown with empty cells up to the highest
//! index assigned, and cells the caller did not touch keep their contents.

mod cache;

use std::collections::HashMap;

use crate::error::{Result, StorageError};

pub use cache::ColumnMapCache;

/// One logical field of a sheet record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Canonical field name (also the first alias)
    pub key: &'static str,
    /// Accepted header spellings, compared after normalisation
    pub aliases: &'static [&'static str],
    /// 0-based column used when no header mapping is available
    pub legacy_index: usize,
}

impl FieldSpec {
    pub const fn new(
        key: &'static str,
        aliases: &'static [&'static str],
        legacy_index: usize,
    ) -> Self {
        Self {
            key,
            aliases,
            legacy_index,
        }
    }
}

/// Normalise a header cell: trimmed, lowercased, with whitespace and
/// underscores removed (`" Due_Date "` → `"duedate"`).
pub fn normalize_header(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_')
        .collect()
}

/// Normalised header name → 0-based column index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    columns: HashMap<String, usize>,
    width: usize,
}

impl ColumnMap {
    /// Build a map from a header row.
    ///
    /// Returns `None` for an empty header or one with no non-blank names,
    /// which sends callers down the legacy positional path. When two header
    /// cells normalise to the same name the leftmost one wins.
    pub fn from_header(header: &[String]) -> Option<Self> {
        let mut columns = HashMap::new();
        for (idx, name) in header.iter().enumerate() {
            let normalized = normalize_header(name);
            if normalized.is_empty() {
                continue;
            }
            columns.entry(normalized).or_insert(idx);
        }

        if columns.is_empty() {
            None
        } else {
            Some(Self {
                columns,
                width: header.len(),
            })
        }
    }

    /// Build a map only if the header names at least one of `fields`.
    ///
    /// A first row that resolves none of the record's aliases is a data row
    /// left over from before the sheet had a header; callers then use the
    /// legacy layout for every field, on writes as well as reads.
    pub fn for_fields(header: &[String], fields: &[FieldSpec]) -> Option<Self> {
        Self::from_header(header).filter(|map| map.resolves_any(fields))
    }

    /// True when at least one field has a header column.
    pub fn resolves_any(&self, fields: &[FieldSpec]) -> bool {
        fields.iter().any(|field| self.resolve(field.aliases).is_some())
    }

    /// First alias present in the header, as a 0-based column.
    pub fn resolve(&self, aliases: &[&str]) -> Option<usize> {
        aliases
            .iter()
            .find_map(|alias| self.columns.get(&normalize_header(alias)).copied())
    }

    /// Number of distinct named columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Cell count of the header row this map was built from.
    pub fn width(&self) -> usize {
        self.width
    }
}

/// Column to read `field` from: header position if known, legacy otherwise.
pub fn column_for(map: Option<&ColumnMap>, field: &FieldSpec) -> usize {
    map.and_then(|m| m.resolve(field.aliases))
        .unwrap_or(field.legacy_index)
}

/// Column to write `field` to.
///
/// With a header, only header-resolved columns are writable: falling back
/// to a legacy index could overwrite whatever column now lives there.
/// Without a header the legacy layout is used.
pub fn write_column_for(map: Option<&ColumnMap>, field: &FieldSpec) -> Option<usize> {
    match map {
        Some(map) => map.resolve(field.aliases),
        None => Some(field.legacy_index),
    }
}

/// Cell contents, or `""` past the end of a ragged row.
pub fn read_cell(row: &[String], idx: usize) -> &str {
    row.get(idx).map(String::as_str).unwrap_or("")
}

/// Assign a cell, growing the row with empty cells as needed.
pub fn write_cell(row: &mut Vec<String>, idx: usize, value: impl Into<String>) {
    if row.len() <= idx {
        row.resize(idx + 1, String::new());
    }
    row[idx] = value.into();
}

/// Field values of one row, in the order of a field list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    fields: &'static [FieldSpec],
    values: Vec<String>,
}

impl RawRecord {
    pub fn new(fields: &'static [FieldSpec], values: Vec<String>) -> Self {
        debug_assert_eq!(fields.len(), values.len());
        Self { fields, values }
    }

    /// Decode using the header map (legacy fallback per field).
    pub fn read(row: &[String], map: Option<&ColumnMap>, fields: &'static [FieldSpec]) -> Self {
        let values = fields
            .iter()
            .map(|field| read_cell(row, column_for(map, field)).to_string())
            .collect();
        Self { fields, values }
    }

    /// Decode using only the legacy positional layout.
    pub fn read_legacy(row: &[String], fields: &'static [FieldSpec]) -> Self {
        Self::read(row, None, fields)
    }

    /// Value of the field named `key`, `""` if there is no such field.
    pub fn get(&self, key: &str) -> &str {
        self.fields
            .iter()
            .position(|field| field.key == key)
            .map(|idx| self.values[idx].as_str())
            .unwrap_or("")
    }

    pub fn fields(&self) -> &'static [FieldSpec] {
        self.fields
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// Copy with every value trimmed.
    pub fn trimmed(&self) -> Self {
        Self {
            fields: self.fields,
            values: self.values.iter().map(|v| v.trim().to_string()).collect(),
        }
    }

    /// Write every field into `row`, leaving other cells untouched.
    ///
    /// Returns the keys that could not be placed (header lacks them).
    pub fn write_into(&self, row: &mut Vec<String>, map: Option<&ColumnMap>) -> Vec<&'static str> {
        let mut unplaced = Vec::new();
        for (field, value) in self.fields.iter().zip(&self.values) {
            match write_column_for(map, field) {
                Some(idx) => write_cell(row, idx, value.clone()),
                None => unplaced.push(field.key),
            }
        }
        unplaced
    }
}

/// A typed record stored one-per-row.
///
/// `to_fields`/`from_fields` use the order of `FIELDS`.
pub trait SheetRecord: Sized {
    const FIELDS: &'static [FieldSpec];

    /// Build from decoded values; `None` if the row is not a usable record.
    fn from_fields(values: &[String]) -> Option<Self>;

    fn to_fields(&self) -> Vec<String>;

    fn to_raw(&self) -> RawRecord {
        RawRecord::new(Self::FIELDS, self.to_fields())
    }
}

/// Decode a row into a typed record.
pub fn decode<R: SheetRecord>(row: &[String], map: Option<&ColumnMap>) -> Option<R> {
    R::from_fields(RawRecord::read(row, map, R::FIELDS).values())
}

/// Encode a typed record into a fresh row for `sheet`.
///
/// Fields the header cannot place are dropped with a warning. A record with
/// no placeable field at all is an error rather than an empty row.
pub fn encode<R: SheetRecord>(record: &R, map: Option<&ColumnMap>, sheet: &str) -> Result<Vec<String>> {
    let mut row = Vec::new();
    let unplaced = record.to_raw().write_into(&mut row, map);
    if unplaced.len() == R::FIELDS.len() {
        return Err(StorageError::NoWritableColumns {
            sheet: sheet.to_string(),
        });
    }
    if !unplaced.is_empty() {
        tracing::warn!(sheet, ?unplaced, "header has no column for fields; values dropped");
    }
    Ok(row)
}

/// True when every cell is blank.
pub fn is_blank_row(row: &[String]) -> bool {
    row.iter().all(|cell| cell.trim().is_empty())
}
