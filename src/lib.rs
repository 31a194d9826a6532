//! Spreadsheet-backed storage core for a personal productivity chatbot.
//!
//! A Google Sheets spreadsheet is the system of record for goals, tasks,
//! logs and conversational sessions. Sessions are event sourced: the
//! `sessions` sheet is an append-only ledger and every session view is a
//! replay of it. Because humans edit the sheets directly, every read and
//! write goes through a header-aware row codec, and a repair engine can
//! realign rows whose columns have drifted.
//!
//! [`state::AppState`] owns the store handle and the column-map cache and
//! builds the repositories:
//!
//! ```rust,ignore
//! let state = AppState::from_settings(&settings).await?;
//! let session = state.sessions().begin(user_id, SessionMode::Daily).await?;
//! let next = state.tasks().find_next_todo().await?;
//! ```

pub mod codec;
pub mod error;
pub mod ledger;
pub mod records;
pub mod repair;
pub mod session;
pub mod settings;
pub mod state;
pub mod store;

#[cfg(feature = "cli")]
pub mod cli;


pub use error::{Result, StorageError};
pub use state::{AppState, SheetNames};
