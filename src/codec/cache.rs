//! Per-process header map cache.
//!
//! Headers change rarely and the store has no header-only read, so append
//! paths resolve the map once per sheet name and keep it for the life of the
//! owning [`AppState`](crate::state::AppState). Entries are never
//! invalidated. Read paths build a fresh map from the rows they just fetched,
//! and the repair engine never consults this cache.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::{ColumnMap, FieldSpec};
use crate::error::Result;
use crate::store::TabularStore;

#[derive(Debug, Default)]
pub struct ColumnMapCache {
    maps: RwLock<HashMap<String, Arc<ColumnMap>>>,
}

impl ColumnMapCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, sheet: &str) -> Option<Arc<ColumnMap>> {
        self.maps.read().get(sheet).cloned()
    }

    /// Store a map; an existing entry for the sheet is kept (first wins).
    pub fn insert(&self, sheet: &str, map: ColumnMap) -> Arc<ColumnMap> {
        self.maps
            .write()
            .entry(sheet.to_string())
            .or_insert_with(|| Arc::new(map))
            .clone()
    }

    /// Cached map for `sheet`, reading the header on first use.
    ///
    /// A sheet without a usable header yields `None` and is not cached, so a
    /// header added later is picked up on the next call. A first row that
    /// names none of `fields` counts as no header.
    pub async fn resolve(
        &self,
        store: &dyn TabularStore,
        sheet: &str,
        fields: &[FieldSpec],
    ) -> Result<Option<Arc<ColumnMap>>> {
        if let Some(map) = self.get(sheet) {
            return Ok(Some(map));
        }

        let rows = store.get_all_rows(sheet).await?;
        let Some(map) = rows
            .first()
            .and_then(|header| ColumnMap::for_fields(header, fields))
        else {
            tracing::debug!(sheet, "no header row; using legacy column layout");
            return Ok(None);
        };

        tracing::debug!(sheet, columns = map.len(), "cached column map");
        Ok(Some(self.insert(sheet, map)))
    }

    pub fn len(&self) -> usize {
        self.maps.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.read().is_empty()
    }
}
