//! Typed record repositories over the `tasks`, `goals` and `logs` sheets.
//!
//! Identity is the `id` cell, never the row position. Every lookup is a
//! linear scan of a fresh read; the 1-based row number found by that scan is
//! used once as the address of a single-cell update and then discarded.

pub mod goal;
pub mod log;
pub mod progress;
pub mod task;

use std::sync::Arc;

use serde::Serialize;

use crate::codec::{decode, encode, write_column_for, ColumnMap, ColumnMapCache, SheetRecord};
use crate::error::{Result, StorageError};
use crate::store::TabularStore;

pub use goal::{GoalRecord, GoalStatus, GoalsRepository};
pub use log::{LogRecord, LogsRepository};
pub use progress::{calculate_goal_progress, list_active_goal_progress, GoalProgress};
pub use task::{Priority, TaskRecord, TaskStatus, TasksRepository};

/// A record with a string identity column.
pub trait Keyed: SheetRecord {
    fn id(&self) -> &str;
}

/// A decoded record plus the 1-based sheet row it was read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Located<R> {
    pub row: usize,
    #[serde(flatten)]
    pub record: R,
}

/// Outcome of a write followed by a read-back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum VerifiedUpdate<R> {
    /// The re-read record holds the written value.
    Applied(R),
    /// No record with that id; nothing was written.
    NotFound,
    /// The re-read disagrees with what was written. `actual` is `None` when
    /// the record could no longer be found.
    Mismatch {
        expected: String,
        actual: Option<String>,
    },
}

impl<R> VerifiedUpdate<R> {
    pub fn is_applied(&self) -> bool {
        matches!(self, VerifiedUpdate::Applied(_))
    }

    /// Collapse into a `Result`: mismatch becomes
    /// [`StorageError::VerificationFailed`], not-found becomes `Ok(None)`.
    pub fn into_result(self, id: &str, field: &str) -> Result<Option<R>> {
        match self {
            VerifiedUpdate::Applied(record) => Ok(Some(record)),
            VerifiedUpdate::NotFound => Ok(None),
            VerifiedUpdate::Mismatch { expected, actual } => {
                Err(StorageError::VerificationFailed {
                    id: id.to_string(),
                    field: field.to_string(),
                    expected,
                    actual: actual.unwrap_or_else(|| "<missing>".to_string()),
                })
            }
        }
    }
}

/// One record sheet: store handle, column cache and sheet name.
#[derive(Clone)]
pub(crate) struct RecordSheet {
    store: Arc<dyn TabularStore>,
    columns: Arc<ColumnMapCache>,
    name: String,
}

impl RecordSheet {
    pub(crate) fn new(
        store: Arc<dyn TabularStore>,
        columns: Arc<ColumnMapCache>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            store,
            columns,
            name: name.into(),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    /// Append one record using the cached header map.
    pub(crate) async fn append<R: SheetRecord>(&self, record: &R) -> Result<()> {
        let map = self
            .columns
            .resolve(self.store.as_ref(), &self.name, R::FIELDS)
            .await?;
        let row = encode(record, map.as_deref(), &self.name)?;
        self.store.append_row(&self.name, row).await
    }

    /// Every decodable data row, in sheet order.
    pub(crate) async fn load<R: SheetRecord>(&self) -> Result<Vec<Located<R>>> {
        let rows = self.store.get_all_rows(&self.name).await?;
        Ok(decode_rows(&rows))
    }

    pub(crate) async fn find<R: Keyed>(&self, id: &str) -> Result<Option<Located<R>>> {
        let rows = self.store.get_all_rows(&self.name).await?;
        Ok(find_in_rows(&rows, id))
    }

    /// Locate `id` and overwrite one field's cell. `Ok(false)` when the id is
    /// absent, in which case nothing is written.
    pub(crate) async fn update_field<R: Keyed>(
        &self,
        id: &str,
        field: &str,
        value: &str,
    ) -> Result<bool> {
        let rows = self.store.get_all_rows(&self.name).await?;
        let Some(found) = find_in_rows::<R>(&rows, id) else {
            tracing::debug!(sheet = %self.name, id, "update skipped; id not found");
            return Ok(false);
        };

        let map = rows
            .first()
            .and_then(|header| ColumnMap::for_fields(header, R::FIELDS));
        let spec = R::FIELDS
            .iter()
            .find(|spec| spec.key == field)
            .ok_or_else(|| StorageError::MissingColumn {
                sheet: self.name.clone(),
                field: field.to_string(),
            })?;
        let column = write_column_for(map.as_ref(), spec).ok_or_else(|| {
            StorageError::MissingColumn {
                sheet: self.name.clone(),
                field: field.to_string(),
            }
        })?;

        self.store
            .update_cell(&self.name, found.row, column + 1, value)
            .await?;
        tracing::debug!(sheet = %self.name, id, field, row = found.row, "cell updated");
        Ok(true)
    }

    /// Update then re-read. `read_field` extracts the value to compare.
    pub(crate) async fn update_verified<R: Keyed>(
        &self,
        id: &str,
        field: &str,
        value: &str,
        read_field: impl Fn(&R) -> String,
    ) -> Result<VerifiedUpdate<R>> {
        if !self.update_field::<R>(id, field, value).await? {
            return Ok(VerifiedUpdate::NotFound);
        }

        let reread = self.find::<R>(id).await?;
        let outcome = match reread {
            Some(found) if read_field(&found.record) == value => {
                VerifiedUpdate::Applied(found.record)
            }
            Some(found) => VerifiedUpdate::Mismatch {
                expected: value.to_string(),
                actual: Some(read_field(&found.record)),
            },
            None => VerifiedUpdate::Mismatch {
                expected: value.to_string(),
                actual: None,
            },
        };

        if let VerifiedUpdate::Mismatch { actual, .. } = &outcome {
            tracing::warn!(
                sheet = %self.name,
                id,
                field,
                expected = value,
                actual = actual.as_deref().unwrap_or("<missing>"),
                "verified update did not stick"
            );
        }
        Ok(outcome)
    }
}

fn decode_rows<R: SheetRecord>(rows: &[Vec<String>]) -> Vec<Located<R>> {
    let Some((header, data)) = rows.split_first() else {
        return Vec::new();
    };
    let map = ColumnMap::for_fields(header, R::FIELDS);
    data.iter()
        .enumerate()
        .filter_map(|(idx, row)| {
            decode::<R>(row, map.as_ref()).map(|record| Located {
                row: idx + 2,
                record,
            })
        })
        .collect()
}

fn find_in_rows<R: Keyed>(rows: &[Vec<String>], id: &str) -> Option<Located<R>> {
    decode_rows::<R>(rows)
        .into_iter()
        .find(|found| found.record.id() == id)
}
