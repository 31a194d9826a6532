use std::sync::Arc;

use anyhow::{Context, Result};
use google_sheets::Client;

use crate::codec::{ColumnMapCache, FieldSpec, SheetRecord};
use crate::ledger::{EventLedger, SessionEvent};
use crate::records::{GoalRecord, GoalsRepository, LogRecord, LogsRepository, TaskRecord, TasksRepository};
use crate::repair::{clamp_limit, managed_schemas, RepairEngine};
use crate::session::SessionRepository;
use crate::settings::get_with_env_fallback;
use crate::settings::schema::{CoachbotSettings, RepairSettings, SheetsSettings};
use crate::store::{MemoryStore, SheetsStore, TabularStore};

/// Physical names of the managed sheets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetNames {
    pub sessions: String,
    pub tasks: String,
    pub goals: String,
    pub logs: String,
}

impl Default for SheetNames {
    fn default() -> Self {
        Self::from(&SheetsSettings::default())
    }
}

impl From<&SheetsSettings> for SheetNames {
    fn from(settings: &SheetsSettings) -> Self {
        Self {
            sessions: settings.sessions_sheet.clone(),
            tasks: settings.tasks_sheet.clone(),
            goals: settings.goals_sheet.clone(),
            logs: settings.logs_sheet.clone(),
        }
    }
}

/// Long-lived context shared by every request: one store handle, one
/// header-map cache, and the sheet names. Repositories are cheap views built
/// from it on demand.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TabularStore>,
    pub columns: Arc<ColumnMapCache>,
    pub sheets: SheetNames,
    pub repair_limits: RepairSettings,
}

impl AppState {
    pub fn new(store: Arc<dyn TabularStore>, sheets: SheetNames) -> Self {
        Self {
            store,
            columns: Arc::new(ColumnMapCache::new()),
            sheets,
            repair_limits: RepairSettings::default(),
        }
    }

    pub fn with_repair_limits(mut self, limits: RepairSettings) -> Self {
        self.repair_limits = limits;
        self
    }

    /// State over an in-process store whose sheets hold only their headers.
    pub fn in_memory(sheets: SheetNames) -> Self {
        let store = MemoryStore::new();
        let seed = |name: &str, fields: &[FieldSpec]| {
            let header = fields.iter().map(|f| f.key.to_string()).collect();
            store.insert_sheet(name, vec![header]);
        };
        seed(&sheets.sessions, SessionEvent::FIELDS);
        seed(&sheets.tasks, TaskRecord::FIELDS);
        seed(&sheets.goals, GoalRecord::FIELDS);
        seed(&sheets.logs, LogRecord::FIELDS);

        Self::new(Arc::new(store), sheets)
    }

    /// Connect to Google Sheets using settings with environment fallback.
    ///
    /// Credentials are tried in order: key file, inline email + key,
    /// Application Default Credentials.
    pub async fn from_settings(settings: &CoachbotSettings) -> Result<Self> {
        let sheets = &settings.sheets;
        let spreadsheet_id =
            get_with_env_fallback(&sheets.spreadsheet_id, &["SHEETS_SPREADSHEET_ID"], None)
                .context("No spreadsheet id: set sheets.spreadsheet_id or SHEETS_SPREADSHEET_ID")?;

        let credentials_path = get_with_env_fallback(
            &sheets.credentials_path,
            &["GOOGLE_APPLICATION_CREDENTIALS"],
            None,
        );
        let client_email = get_with_env_fallback(&sheets.client_email, &["GOOGLE_CLIENT_EMAIL"], None);
        let private_key = get_with_env_fallback(&sheets.private_key, &["GOOGLE_PRIVATE_KEY"], None);

        let client = match (credentials_path, client_email, private_key) {
            (Some(path), _, _) => {
                tracing::debug!(path = %path, "using service account key file");
                Client::from_service_account(&path, &spreadsheet_id).await
            }
            (None, Some(email), Some(key)) => {
                tracing::debug!(client_email = %email, "using inline service account key");
                Client::from_key_parts(&email, &key, &spreadsheet_id).await
            }
            _ => {
                tracing::debug!("using application default credentials");
                Client::from_env(&spreadsheet_id).await
            }
        }
        .context("Failed to create Google Sheets client")?;

        tracing::info!(spreadsheet_id = %spreadsheet_id, "connected to spreadsheet");
        Ok(Self::new(Arc::new(SheetsStore::new(client)), SheetNames::from(sheets))
            .with_repair_limits(settings.repair.clone()))
    }

    pub fn ledger(&self) -> EventLedger {
        EventLedger::new(
            self.store.clone(),
            self.columns.clone(),
            self.sheets.sessions.clone(),
        )
    }

    pub fn sessions(&self) -> SessionRepository {
        SessionRepository::new(self.ledger())
    }

    pub fn tasks(&self) -> TasksRepository {
        TasksRepository::new(self.store.clone(), self.columns.clone(), self.sheets.tasks.clone())
    }

    pub fn goals(&self) -> GoalsRepository {
        GoalsRepository::new(self.store.clone(), self.columns.clone(), self.sheets.goals.clone())
    }

    pub fn logs(&self) -> LogsRepository {
        LogsRepository::new(self.store.clone(), self.columns.clone(), self.sheets.logs.clone())
    }

    /// Repair engine over every managed sheet. It does not share the column cache.
    pub fn repair_engine(&self) -> RepairEngine {
        RepairEngine::new(self.store.clone(), managed_schemas(&self.sheets))
    }

    /// Apply the configured default and maximum to a caller's limit.
    pub fn repair_limit(&self, raw: Option<f64>) -> usize {
        clamp_limit(
            raw,
            self.repair_limits.default_limit,
            self.repair_limits.max_limit,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_seeds_headers() {
        let state = AppState::in_memory(SheetNames::default());
        let rows = state.store.get_all_rows("tasks").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][0], "id");
        assert_eq!(rows[0][7], "sourceLogId");
        assert!(state.store.get_all_rows("sessions").await.is_ok());
    }

    #[tokio::test]
    async fn test_repositories_share_column_cache() {
        let state = AppState::in_memory(SheetNames::default());
        state
            .tasks()
            .add(&TaskRecord {
                id: "t_1".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        state.sessions().start("u1", Default::default()).await.unwrap();
        assert_eq!(state.columns.len(), 2);
    }

    #[test]
    fn test_repair_limit_uses_configured_bounds() {
        let state = AppState::in_memory(SheetNames::default()).with_repair_limits(RepairSettings {
            default_limit: 50,
            max_limit: 200,
        });
        assert_eq!(state.repair_limit(None), 50);
        assert_eq!(state.repair_limit(Some(1000.0)), 200);
        assert_eq!(state.repair_limit(Some(0.0)), 1);
    }

    #[test]
    fn test_sheet_names_from_settings() {
        let settings = SheetsSettings {
            logs_sheet: "Journal".into(),
            ..Default::default()
        };
        let names = SheetNames::from(&settings);
        assert_eq!(names.logs, "Journal");
        assert_eq!(names.sessions, "sessions");
    }
}
