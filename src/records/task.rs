use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Keyed, Located, RecordSheet, VerifiedUpdate};
use crate::codec::{ColumnMapCache, FieldSpec, SheetRecord};
use crate::error::Result;
use crate::ledger::parse_timestamp;
use crate::store::TabularStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Todo,
    Done,
    Miss,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [TaskStatus::Todo, TaskStatus::Done, TaskStatus::Miss];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::Done => "done",
            TaskStatus::Miss => "miss",
        }
    }

    /// Case-insensitive; surrounding whitespace ignored.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|s| s.as_str().eq_ignore_ascii_case(value))
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("invalid task status: {} (todo|done|miss)", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Priority {
    A,
    B,
    C,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::A => "A",
            Priority::B => "B",
            Priority::C => "C",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "A" => Some(Priority::A),
            "B" => Some(Priority::B),
            "C" => Some(Priority::C),
            _ => None,
        }
    }

    /// Sort rank; unmarked or unknown priorities go last.
    pub fn rank(value: &str) -> u8 {
        match Self::parse(value) {
            Some(Priority::A) => 0,
            Some(Priority::B) => 1,
            Some(Priority::C) => 2,
            None => 9,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the `tasks` sheet. Values are kept as stored so hand-edited
/// cells survive a read/write cycle; use the typed accessors to interpret
/// them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    pub id: String,
    pub goal_id: String,
    pub description: String,
    pub status: String,
    pub due_date: String,
    pub priority: String,
    pub assigned_at: String,
    pub source_log_id: String,
}

impl TaskRecord {
    pub fn status(&self) -> Option<TaskStatus> {
        TaskStatus::parse(&self.status)
    }

    pub fn priority(&self) -> Option<Priority> {
        Priority::parse(&self.priority)
    }

    pub fn due(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.due_date)
    }

    pub fn assigned(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.assigned_at)
    }
}

pub(crate) const TASK_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("id", &["id"], 0),
    FieldSpec::new("goalId", &["goalId", "goal_id"], 1),
    FieldSpec::new("description", &["description"], 2),
    FieldSpec::new("status", &["status"], 3),
    FieldSpec::new("dueDate", &["dueDate", "due_date"], 4),
    FieldSpec::new("priority", &["priority"], 5),
    FieldSpec::new("assignedAt", &["assignedAt", "assigned_at"], 6),
    FieldSpec::new("sourceLogId", &["sourceLogId", "source_log_id"], 7),
];

impl SheetRecord for TaskRecord {
    const FIELDS: &'static [FieldSpec] = TASK_FIELDS;

    fn from_fields(values: &[String]) -> Option<Self> {
        let id = values[0].trim();
        if id.is_empty() {
            return None;
        }
        Some(Self {
            id: id.to_string(),
            goal_id: values[1].clone(),
            description: values[2].clone(),
            status: values[3].clone(),
            due_date: values[4].clone(),
            priority: values[5].clone(),
            assigned_at: values[6].clone(),
            source_log_id: values[7].clone(),
        })
    }

    fn to_fields(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.goal_id.clone(),
            self.description.clone(),
            self.status.clone(),
            self.due_date.clone(),
            self.priority.clone(),
            self.assigned_at.clone(),
            self.source_log_id.clone(),
        ]
    }
}

impl Keyed for TaskRecord {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Missing or unparseable dates sort after every real date.
fn cmp_dates(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Priority, then due date, then assignment time, then row.
fn todo_order(a: &Located<TaskRecord>, b: &Located<TaskRecord>) -> Ordering {
    Priority::rank(&a.record.priority)
        .cmp(&Priority::rank(&b.record.priority))
        .then_with(|| cmp_dates(a.record.due(), b.record.due()))
        .then_with(|| cmp_dates(a.record.assigned(), b.record.assigned()))
        .then_with(|| a.row.cmp(&b.row))
}

#[derive(Clone)]
pub struct TasksRepository {
    sheet: RecordSheet,
}

impl TasksRepository {
    pub fn new(
        store: Arc<dyn TabularStore>,
        columns: Arc<ColumnMapCache>,
        sheet: impl Into<String>,
    ) -> Self {
        Self {
            sheet: RecordSheet::new(store, columns, sheet),
        }
    }

    pub async fn add(&self, task: &TaskRecord) -> Result<()> {
        self.sheet.append(task).await?;
        tracing::debug!(sheet = %self.sheet.name(), id = %task.id, "task added");
        Ok(())
    }

    pub async fn list_all(&self) -> Result<Vec<Located<TaskRecord>>> {
        self.sheet.load().await
    }

    /// Open tasks, best candidate first.
    pub async fn list_todos(&self) -> Result<Vec<Located<TaskRecord>>> {
        let mut todos: Vec<_> = self
            .list_all()
            .await?
            .into_iter()
            .filter(|t| t.record.status() == Some(TaskStatus::Todo))
            .collect();
        todos.sort_by(todo_order);
        Ok(todos)
    }

    pub async fn find_next_todo(&self) -> Result<Option<Located<TaskRecord>>> {
        Ok(self.list_todos().await?.into_iter().next())
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<Located<TaskRecord>>> {
        self.sheet.find(id).await
    }

    pub async fn list_by_goal_id(&self, goal_id: &str) -> Result<Vec<Located<TaskRecord>>> {
        Ok(self
            .list_all()
            .await?
            .into_iter()
            .filter(|t| t.record.goal_id == goal_id)
            .collect())
    }

    pub async fn count_by_goal_and_status(
        &self,
        goal_id: &str,
        status: TaskStatus,
    ) -> Result<usize> {
        Ok(self
            .list_by_goal_id(goal_id)
            .await?
            .iter()
            .filter(|t| t.record.status() == Some(status))
            .count())
    }

    pub async fn update_status(&self, id: &str, status: TaskStatus) -> Result<bool> {
        self.sheet
            .update_field::<TaskRecord>(id, "status", status.as_str())
            .await
    }

    pub async fn update_due_date(&self, id: &str, due_date: &str) -> Result<bool> {
        self.sheet
            .update_field::<TaskRecord>(id, "dueDate", due_date)
            .await
    }

    pub async fn update_priority(&self, id: &str, priority: Option<Priority>) -> Result<bool> {
        let value = priority.map(|p| p.as_str()).unwrap_or("");
        self.sheet
            .update_field::<TaskRecord>(id, "priority", value)
            .await
    }

    /// Status transition that is read back before reporting success.
    pub async fn update_status_verified(
        &self,
        id: &str,
        status: TaskStatus,
    ) -> Result<VerifiedUpdate<TaskRecord>> {
        self.sheet
            .update_verified(id, "status", status.as_str(), |t: &TaskRecord| {
                t.status.trim().to_string()
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    const HEADER: &[&str] = &[
        "id",
        "goalId",
        "description",
        "status",
        "dueDate",
        "priority",
        "assignedAt",
        "sourceLogId",
    ];

    fn repo(rows: &[&[&str]]) -> (Arc<MemoryStore>, TasksRepository) {
        let store = Arc::new(MemoryStore::new().with_sheet("tasks", rows));
        let repo = TasksRepository::new(store.clone(), Arc::new(ColumnMapCache::new()), "tasks");
        (store, repo)
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(TaskStatus::parse(" TODO "), Some(TaskStatus::Todo));
        assert_eq!(TaskStatus::parse("Miss"), Some(TaskStatus::Miss));
        assert_eq!(TaskStatus::parse("later"), None);
        assert!("done".parse::<TaskStatus>().is_ok());
    }

    #[test]
    fn test_priority_rank() {
        assert_eq!(Priority::rank("a"), 0);
        assert_eq!(Priority::rank("C"), 2);
        assert_eq!(Priority::rank(""), 9);
        assert_eq!(Priority::rank("Z"), 9);
    }

    #[tokio::test]
    async fn test_list_todos_ordering() {
        let (_store, repo) = repo(&[
            HEADER,
            &["t_1", "", "no priority", "todo", "", "", "", ""],
            &["t_2", "", "b late", "todo", "2024-02-01", "B", "", ""],
            &["t_3", "", "b early", "todo", "2024-01-15", "B", "", ""],
            &["t_4", "", "b undated new", "todo", "", "B", "2024-01-02T00:00:00Z", ""],
            &["t_5", "", "b undated old", "todo", "", "B", "2024-01-01T00:00:00Z", ""],
            &["t_6", "", "a", "TODO", "", "A", "", ""],
            &["t_7", "", "done", "done", "", "A", "", ""],
            &["t_8", "", "b undated unassigned", "todo", "", "B", "", ""],
            &["t_9", "", "b undated unassigned later row", "todo", "", "B", "", ""],
        ]);

        let ids: Vec<String> = repo
            .list_todos()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.record.id)
            .collect();
        assert_eq!(
            ids,
            vec!["t_6", "t_3", "t_2", "t_5", "t_4", "t_8", "t_9", "t_1"]
        );
        assert_eq!(
            repo.find_next_todo().await.unwrap().unwrap().record.id,
            "t_6"
        );
    }

    #[tokio::test]
    async fn test_update_uses_header_column() {
        let (store, repo) = repo(&[
            &["status", "id", "description"],
            &["todo", "t_1", "reordered"],
        ]);
        assert!(repo.update_status("t_1", TaskStatus::Done).await.unwrap());
        assert_eq!(store.rows("tasks")[1], vec!["done", "t_1", "reordered"]);
    }

    #[tokio::test]
    async fn test_update_missing_column_errors_without_write() {
        let (store, repo) = repo(&[&["id", "status"], &["t_1", "todo"]]);
        let err = repo
            .update_due_date("t_1", "2024-01-01")
            .await
            .unwrap_err();
        assert!(matches!(err, crate::error::StorageError::MissingColumn { .. }));
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_update_priority_clears() {
        let (store, repo) = repo(&[HEADER, &["t_1", "", "x", "todo", "", "A", "", ""]]);
        assert!(repo.update_priority("t_1", None).await.unwrap());
        assert_eq!(store.rows("tasks")[1][5], "");
        assert!(repo.update_priority("t_1", Some(Priority::C)).await.unwrap());
        assert_eq!(store.rows("tasks")[1][5], "C");
    }

    #[tokio::test]
    async fn test_goal_queries() {
        let (_store, repo) = repo(&[
            HEADER,
            &["t_1", "g_1", "a", "done", "", "", "", ""],
            &["t_2", "g_1", "b", "todo", "", "", "", ""],
            &["t_3", "g_2", "c", "done", "", "", "", ""],
        ]);
        assert_eq!(repo.list_by_goal_id("g_1").await.unwrap().len(), 2);
        assert_eq!(
            repo.count_by_goal_and_status("g_1", TaskStatus::Done)
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_verified_update_outcomes() {
        let (store, repo) = repo(&[HEADER, &["t_1", "", "x", "todo", "", "", "", ""]]);

        let applied = repo
            .update_status_verified("t_1", TaskStatus::Done)
            .await
            .unwrap();
        match applied {
            VerifiedUpdate::Applied(task) => assert_eq!(task.status, "done"),
            other => panic!("expected Applied, got {:?}", other),
        }

        let writes = store.write_count();
        assert_eq!(
            repo.update_status_verified("t_404", TaskStatus::Done)
                .await
                .unwrap(),
            VerifiedUpdate::NotFound
        );
        assert_eq!(store.write_count(), writes);
    }

    #[tokio::test]
    async fn test_add_without_header_uses_legacy_layout() {
        let (store, repo) = repo(&[]);
        let task = TaskRecord {
            id: "t_1".into(),
            description: "stretch".into(),
            status: "todo".into(),
            ..Default::default()
        };
        repo.add(&task).await.unwrap();
        assert_eq!(
            store.rows("tasks")[0],
            vec!["t_1", "", "stretch", "todo", "", "", "", ""]
        );
    }

    #[tokio::test]
    async fn test_add_and_update_when_first_row_is_legacy_data() {
        let (store, repo) = repo(&[&[
            "t_0",
            "",
            "old",
            "todo",
            "",
            "",
            "2024-01-01T00:00:00Z",
            "",
        ]]);
        let task = TaskRecord {
            id: "t_1".into(),
            description: "stretch".into(),
            status: "todo".into(),
            assigned_at: "2024-02-01T00:00:00Z".into(),
            ..Default::default()
        };
        repo.add(&task).await.unwrap();
        assert_eq!(
            store.rows("tasks")[1],
            vec!["t_1", "", "stretch", "todo", "", "", "2024-02-01T00:00:00Z", ""]
        );

        assert!(repo.update_status("t_1", TaskStatus::Done).await.unwrap());
        assert_eq!(store.rows("tasks")[1][3], "done");
        assert_eq!(
            repo.find_by_id("t_1").await.unwrap().unwrap().record.status,
            "done"
        );
    }
}
