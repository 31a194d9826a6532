//! Append-only event ledger stored in one sheet.
//!
//! The ledger has no update or delete. Ordering between concurrent writers is
//! whatever order the backing store applied the appends in; the position of
//! a row in the sheet is reported back as [`LedgerEntry::position`] so replay
//! can use it as a tie-break.

pub mod events;

use std::sync::Arc;

use crate::codec::{decode, encode, ColumnMap, ColumnMapCache, SheetRecord};
use crate::error::Result;
use crate::store::TabularStore;

pub use events::{now_timestamp, parse_timestamp, EventType, SessionEvent};

/// An event together with its 0-based position among the ledger's data rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub position: usize,
    pub event: SessionEvent,
}

#[derive(Clone)]
pub struct EventLedger {
    store: Arc<dyn TabularStore>,
    columns: Arc<ColumnMapCache>,
    sheet: String,
}

impl EventLedger {
    pub fn new(
        store: Arc<dyn TabularStore>,
        columns: Arc<ColumnMapCache>,
        sheet: impl Into<String>,
    ) -> Self {
        Self {
            store,
            columns,
            sheet: sheet.into(),
        }
    }

    pub fn sheet(&self) -> &str {
        &self.sheet
    }

    /// Append one event as one row. Store errors propagate unchanged.
    pub async fn append(&self, event: &SessionEvent) -> Result<()> {
        let map = self
            .columns
            .resolve(self.store.as_ref(), &self.sheet, SessionEvent::FIELDS)
            .await?;
        let row = encode(event, map.as_deref(), &self.sheet)?;

        self.store.append_row(&self.sheet, row).await.map_err(|e| {
            tracing::error!(
                sheet = %self.sheet,
                session_id = %event.session_id,
                event_type = %event.event_type,
                "ledger append failed: {}",
                e
            );
            e
        })?;

        tracing::debug!(
            session_id = %event.session_id,
            event_type = %event.event_type,
            "ledger event appended"
        );
        Ok(())
    }

    /// Every decodable event belonging to `user_id`, in sheet order.
    ///
    /// Reads the whole sheet on each call. Rows without a session id are
    /// dropped silently.
    pub async fn fetch_all_for_user(&self, user_id: &str) -> Result<Vec<LedgerEntry>> {
        let rows = self.store.get_all_rows(&self.sheet).await?;
        let Some((header, data)) = rows.split_first() else {
            return Ok(Vec::new());
        };
        let map = ColumnMap::for_fields(header, SessionEvent::FIELDS);

        let mut skipped = 0usize;
        let entries: Vec<LedgerEntry> = data
            .iter()
            .enumerate()
            .filter_map(|(position, row)| match decode::<SessionEvent>(row, map.as_ref()) {
                Some(event) => Some(LedgerEntry { position, event }),
                None => {
                    skipped += 1;
                    None
                }
            })
            .filter(|entry| entry.event.user_id == user_id)
            .collect();

        if skipped > 0 {
            tracing::trace!(sheet = %self.sheet, skipped, "ledger rows without session id skipped");
        }
        Ok(entries)
    }
}
