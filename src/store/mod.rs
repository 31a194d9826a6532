//! Backing tabular store boundary.
//!
//! Everything above this module sees a spreadsheet as named sheets of string
//! rows, with row 0 as the header. Row and column indices passed to the
//! update calls are 1-based, matching the Sheets API.
//!
//! There are no transactions and no concurrency tokens: a row index read a
//! moment ago may point at a different record by the time it is written.
//! Callers re-resolve positions before every update.

mod memory;
mod sheets;

use async_trait::async_trait;

use crate::error::Result;

pub use memory::MemoryStore;
pub use sheets::SheetsStore;

#[async_trait]
pub trait TabularStore: Send + Sync {
    /// Append one row after the last used row of `sheet`.
    async fn append_row(&self, sheet: &str, row: Vec<String>) -> Result<()>;

    /// Fetch every row of `sheet`, header included.
    async fn get_all_rows(&self, sheet: &str) -> Result<Vec<Vec<String>>>;

    /// Overwrite a single cell.
    async fn update_cell(&self, sheet: &str, row: usize, column: usize, value: &str)
        -> Result<()>;

    /// Overwrite the first `values.len()` cells of a row.
    async fn update_row(&self, sheet: &str, row: usize, values: Vec<String>) -> Result<()>;
}
