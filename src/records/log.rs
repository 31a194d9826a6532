use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{Keyed, Located, RecordSheet};
use crate::codec::{ColumnMapCache, FieldSpec, SheetRecord};
use crate::error::Result;
use crate::ledger::parse_timestamp;
use crate::store::TabularStore;

/// One analysed journal entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    pub id: String,
    pub timestamp: String,
    pub user_id: String,
    pub raw_text: String,
    pub emotion: String,
    pub core_issue: String,
    pub current_goal: String,
    pub today_task: String,
    pub warning: String,
}

pub(crate) const LOG_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("id", &["id"], 0),
    FieldSpec::new("timestamp", &["timestamp"], 1),
    FieldSpec::new("userId", &["userId", "user_id"], 2),
    FieldSpec::new("rawText", &["rawText", "raw_text"], 3),
    FieldSpec::new("emotion", &["emotion"], 4),
    FieldSpec::new("coreIssue", &["coreIssue", "core_issue"], 5),
    FieldSpec::new("currentGoal", &["currentGoal", "current_goal"], 6),
    FieldSpec::new("todayTask", &["todayTask", "today_task"], 7),
    FieldSpec::new("warning", &["warning"], 8),
];

impl SheetRecord for LogRecord {
    const FIELDS: &'static [FieldSpec] = LOG_FIELDS;

    fn from_fields(values: &[String]) -> Option<Self> {
        let id = values[0].trim();
        if id.is_empty() {
            return None;
        }
        Some(Self {
            id: id.to_string(),
            timestamp: values[1].clone(),
            user_id: values[2].clone(),
            raw_text: values[3].clone(),
            emotion: values[4].clone(),
            core_issue: values[5].clone(),
            current_goal: values[6].clone(),
            today_task: values[7].clone(),
            warning: values[8].clone(),
        })
    }

    fn to_fields(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.timestamp.clone(),
            self.user_id.clone(),
            self.raw_text.clone(),
            self.emotion.clone(),
            self.core_issue.clone(),
            self.current_goal.clone(),
            self.today_task.clone(),
            self.warning.clone(),
        ]
    }
}

impl Keyed for LogRecord {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Clone)]
pub struct LogsRepository {
    sheet: RecordSheet,
}

impl LogsRepository {
    pub fn new(
        store: Arc<dyn TabularStore>,
        columns: Arc<ColumnMapCache>,
        sheet: impl Into<String>,
    ) -> Self {
        Self {
            sheet: RecordSheet::new(store, columns, sheet),
        }
    }

    pub async fn add(&self, log: &LogRecord) -> Result<()> {
        self.sheet.append(log).await
    }

    /// Logs from the last `days` days, at most `limit`, oldest first.
    ///
    /// A window reaching past the earliest representable time covers every
    /// log.
    pub async fn list_recent(&self, days: u32, limit: usize) -> Result<Vec<Located<LogRecord>>> {
        let cutoff = Duration::try_days(i64::from(days))
            .and_then(|window| Utc::now().checked_sub_signed(window))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        self.list_since(cutoff, limit).await
    }

    /// Rows whose timestamp parses and is at or after `cutoff`; when more
    /// than `limit` match, the last `limit` in sheet order are kept.
    pub async fn list_since(
        &self,
        cutoff: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Located<LogRecord>>> {
        let mut recent: Vec<Located<LogRecord>> = self
            .sheet
            .load::<LogRecord>()
            .await?
            .into_iter()
            .filter(|log| parse_timestamp(&log.record.timestamp).is_some_and(|ts| ts >= cutoff))
            .collect();

        let overflow = recent.len().saturating_sub(limit);
        recent.drain(..overflow);
        Ok(recent)
    }
}
