//! Settings schema definitions for coachbot configuration.
//!
//! All settings structs use `#[serde(default)]` to allow partial configuration files.
//! Missing fields are filled with sensible defaults.

use serde::{Deserialize, Serialize};

/// Root settings structure.
///
/// Loaded from `~/.coachbot/settings.toml` with environment variable interpolation support.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoachbotSettings {
    /// Schema version for migrations
    pub version: u32,

    /// Spreadsheet backend
    pub sheets: SheetsSettings,

    /// Internal admin HTTP server
    pub server: ServerSettings,

    /// Schema repair bounds
    pub repair: RepairSettings,

    /// Advanced/debug settings
    pub advanced: AdvancedSettings,
}

/// Google Sheets connection and sheet names.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetsSettings {
    /// Spreadsheet id (the long token in the sheet URL)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spreadsheet_id: Option<String>,

    /// Path to a service account JSON key file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials_path: Option<String>,

    /// Service account email, used with `private_key` when no key file is given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_email: Option<String>,

    /// PEM private key; `\n` escapes are accepted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,

    pub sessions_sheet: String,
    pub tasks_sheet: String,
    pub goals_sheet: String,
    pub logs_sheet: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub port: u16,

    /// Shared secret for `/internal/*` routes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internal_api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RepairSettings {
    /// Limit used when a caller gives none
    pub default_limit: usize,

    /// Upper bound for caller-supplied limits
    pub max_limit: usize,
}

/// Advanced/debug settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvancedSettings {
    /// Log level: "error" | "warn" | "info" | "debug" | "trace"
    pub log_level: String,
}

// =============================================================================
// Default implementations
// =============================================================================

impl Default for CoachbotSettings {
    fn default() -> Self {
        Self {
            version: 1,
            sheets: SheetsSettings::default(),
            server: ServerSettings::default(),
            repair: RepairSettings::default(),
            advanced: AdvancedSettings::default(),
        }
    }
}

impl Default for SheetsSettings {
    fn default() -> Self {
        Self {
            spreadsheet_id: None,
            credentials_path: None,
            client_email: None,
            private_key: None,
            sessions_sheet: "sessions".to_string(),
            tasks_sheet: "tasks".to_string(),
            goals_sheet: "goals".to_string(),
            logs_sheet: "logs".to_string(),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: 8787,
            internal_api_key: None,
        }
    }
}

impl Default for RepairSettings {
    fn default() -> Self {
        Self {
            default_limit: crate::repair::DEFAULT_REPAIR_LIMIT,
            max_limit: crate::repair::MAX_REPAIR_LIMIT,
        }
    }
}

impl Default for AdvancedSettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
