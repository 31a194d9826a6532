//! Google Sheets implementation of [`TabularStore`].

use async_trait::async_trait;
use google_sheets::{a1, Client, ValueInputOption};

use super::TabularStore;
use crate::error::Result;

/// Store backed by one Google spreadsheet; each sheet is a tab.
#[derive(Debug, Clone)]
pub struct SheetsStore {
    client: Client,
}

impl SheetsStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn spreadsheet_id(&self) -> &str {
        self.client.spreadsheet_id()
    }
}

#[async_trait]
impl TabularStore for SheetsStore {
    async fn append_row(&self, sheet: &str, row: Vec<String>) -> Result<()> {
        let range = a1::sheet_range(sheet);
        self.client
            .append_values(&range, vec![row], ValueInputOption::Raw)
            .await?;
        Ok(())
    }

    async fn get_all_rows(&self, sheet: &str) -> Result<Vec<Vec<String>>> {
        let range = a1::sheet_range(sheet);
        let values = self.client.get_values(&range).await?;
        Ok(values.rows())
    }

    async fn update_cell(
        &self,
        sheet: &str,
        row: usize,
        column: usize,
        value: &str,
    ) -> Result<()> {
        let range = a1::cell_range(sheet, row, column)?;
        self.client
            .update_values(&range, vec![vec![value.to_string()]], ValueInputOption::Raw)
            .await?;
        Ok(())
    }

    async fn update_row(&self, sheet: &str, row: usize, values: Vec<String>) -> Result<()> {
        let range = a1::row_range(sheet, row, values.len())?;
        self.client
            .update_values(&range, vec![values], ValueInputOption::Raw)
            .await?;
        Ok(())
    }
}
