//! Minimal Google Sheets v4 client covering the `spreadsheets.values` calls
//! needed to treat a spreadsheet as a row store.
//!
//! Only three operations are exposed: append a row, read a range, and
//! overwrite a range. Batch updates, formatting and sheet management are
//! intentionally absent.
//!
//! # Example
//!
//! ```rust,no_run
//! use google_sheets::{a1, Client};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::from_service_account(
//!         "/path/to/service-account.json",
//!         "spreadsheet-id",
//!     ).await?;
//!
//!     let range = a1::sheet_range("tasks");
//!     let values = client.get_values(&range).await?;
//!     for row in values.rows() {
//!         println!("{:?}", row);
//!     }
//!     Ok(())
//! }
//! ```

pub mod a1;
mod client;
mod error;
mod types;
mod values;

pub use client::Client;
pub use error::SheetsError;
pub use types::*;

/// OAuth2 scope for read/write access to spreadsheets
pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
