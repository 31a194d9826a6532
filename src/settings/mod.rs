//! TOML-based settings for coachbot.
//!
//! Settings are loaded from `~/.coachbot/settings.toml` with environment
//! variable interpolation support. Deployments that only set environment
//! variables keep working through the `get_with_env_fallback` helper.
//!
//! # Usage
//!
//! ```rust,ignore
//! use crate::settings::{SettingsManager, get_with_env_fallback};
//!
//! let manager = SettingsManager::new().await?;
//! let settings = manager.get().await;
//!
//! let spreadsheet_id = get_with_env_fallback(
//!     &settings.sheets.spreadsheet_id,
//!     &["SHEETS_SPREADSHEET_ID"],
//!     None,
//! );
//! ```

pub mod loader;
pub mod schema;

pub use loader::{get_with_env_fallback, settings_path, SettingsManager};
pub use schema::CoachbotSettings;
