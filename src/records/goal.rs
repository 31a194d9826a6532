use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{Keyed, Located, RecordSheet, VerifiedUpdate};
use crate::codec::{ColumnMapCache, FieldSpec, SheetRecord};
use crate::error::Result;
use crate::store::TabularStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalStatus {
    #[default]
    Pending,
    Approved,
    Archived,
}

impl GoalStatus {
    pub const ALL: [GoalStatus; 3] = [
        GoalStatus::Pending,
        GoalStatus::Approved,
        GoalStatus::Archived,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GoalStatus::Pending => "pending",
            GoalStatus::Approved => "approved",
            GoalStatus::Archived => "archived",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|s| s.as_str().eq_ignore_ascii_case(value))
    }

    /// Goals still being worked on.
    pub fn is_active(&self) -> bool {
        matches!(self, GoalStatus::Pending | GoalStatus::Approved)
    }
}

impl std::fmt::Display for GoalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for GoalStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s)
            .ok_or_else(|| format!("invalid goal status: {} (pending|approved|archived)", s))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalRecord {
    pub id: String,
    pub title: String,
    pub confidence: String,
    /// Stored text; a blank cell reads as `pending`
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

impl GoalRecord {
    pub fn status(&self) -> Option<GoalStatus> {
        GoalStatus::parse(&self.status)
    }
}

pub(crate) const GOAL_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("id", &["id"], 0),
    FieldSpec::new("title", &["title"], 1),
    FieldSpec::new("confidence", &["confidence"], 2),
    FieldSpec::new("status", &["status"], 3),
    FieldSpec::new("createdAt", &["createdAt", "created_at"], 4),
    FieldSpec::new("updatedAt", &["updatedAt", "updated_at"], 5),
];

impl SheetRecord for GoalRecord {
    const FIELDS: &'static [FieldSpec] = GOAL_FIELDS;

    fn from_fields(values: &[String]) -> Option<Self> {
        let id = values[0].trim();
        if id.is_empty() {
            return None;
        }
        let status = if values[3].trim().is_empty() {
            GoalStatus::Pending.as_str().to_string()
        } else {
            values[3].clone()
        };
        Some(Self {
            id: id.to_string(),
            title: values[1].clone(),
            confidence: values[2].clone(),
            status,
            created_at: values[4].clone(),
            updated_at: values[5].clone(),
        })
    }

    fn to_fields(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.title.clone(),
            self.confidence.clone(),
            self.status.clone(),
            self.created_at.clone(),
            self.updated_at.clone(),
        ]
    }
}

impl Keyed for GoalRecord {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Clone)]
pub struct GoalsRepository {
    sheet: RecordSheet,
}

impl GoalsRepository {
    pub fn new(
        store: Arc<dyn TabularStore>,
        columns: Arc<ColumnMapCache>,
        sheet: impl Into<String>,
    ) -> Self {
        Self {
            sheet: RecordSheet::new(store, columns, sheet),
        }
    }

    pub async fn add(&self, goal: &GoalRecord) -> Result<()> {
        self.sheet.append(goal).await
    }

    pub async fn list(&self) -> Result<Vec<Located<GoalRecord>>> {
        self.sheet.load().await
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<Located<GoalRecord>>> {
        self.sheet.find(id).await
    }

    pub async fn update_status(&self, id: &str, status: GoalStatus) -> Result<bool> {
        self.sheet
            .update_field::<GoalRecord>(id, "status", status.as_str())
            .await
    }

    pub async fn update_status_verified(
        &self,
        id: &str,
        status: GoalStatus,
    ) -> Result<VerifiedUpdate<GoalRecord>> {
        self.sheet
            .update_verified(id, "status", status.as_str(), |g: &GoalRecord| {
                g.status.trim().to_string()
            })
            .await
    }

    /// Goals are never deleted; archiving is a status transition.
    pub async fn archive(&self, id: &str) -> Result<VerifiedUpdate<GoalRecord>> {
        let outcome = self.update_status_verified(id, GoalStatus::Archived).await?;
        if outcome.is_applied() {
            tracing::info!(goal_id = id, "goal archived");
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn repo(rows: &[&[&str]]) -> (Arc<MemoryStore>, GoalsRepository) {
        let store = Arc::new(MemoryStore::new().with_sheet("goals", rows));
        let repo = GoalsRepository::new(store.clone(), Arc::new(ColumnMapCache::new()), "goals");
        (store, repo)
    }

    #[tokio::test]
    async fn test_blank_status_reads_pending() {
        let (_store, repo) = repo(&[
            &["id", "title", "confidence", "status", "createdAt", "updatedAt"],
            &["g_1", "run 10k", "0.8", "", "2024-01-01", "2024-01-01"],
        ]);
        let goals = repo.list().await.unwrap();
        assert_eq!(goals[0].record.status(), Some(GoalStatus::Pending));
        assert_eq!(goals[0].row, 2);
    }

    #[tokio::test]
    async fn test_archive_is_status_transition() {
        let (store, repo) = repo(&[
            &["title", "id", "status"],
            &["learn rust", "g_1", "approved"],
        ]);
        let outcome = repo.archive("g_1").await.unwrap();
        assert!(outcome.is_applied());
        assert_eq!(store.rows("goals")[1], vec!["learn rust", "g_1", "archived"]);
        assert_eq!(store.rows("goals").len(), 2);
    }

    #[tokio::test]
    async fn test_update_unknown_goal() {
        let (store, repo) = repo(&[&["id", "status"]]);
        assert!(!repo.update_status("g_x", GoalStatus::Approved).await.unwrap());
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn test_status_active() {
        assert!(GoalStatus::Pending.is_active());
        assert!(GoalStatus::Approved.is_active());
        assert!(!GoalStatus::Archived.is_active());
        assert_eq!("ARCHIVED".parse::<GoalStatus>(), Ok(GoalStatus::Archived));
    }
}
