//! Per-sheet field lists and row validators used by the repair engine.

use crate::codec::{FieldSpec, RawRecord, SheetRecord};
use crate::ledger::{parse_timestamp, EventType, SessionEvent};
use crate::records::{GoalRecord, GoalStatus, LogRecord, Priority, TaskRecord, TaskStatus};
use crate::state::SheetNames;

/// Validation rule for one sheet's decoded (trimmed) values.
pub type Validator = fn(&RawRecord) -> bool;

#[derive(Clone)]
pub struct SheetSchema {
    /// Physical sheet name in the store
    pub sheet: String,
    pub fields: &'static [FieldSpec],
    pub validate: Validator,
}

impl SheetSchema {
    pub fn new(sheet: impl Into<String>, fields: &'static [FieldSpec], validate: Validator) -> Self {
        Self {
            sheet: sheet.into(),
            fields,
            validate,
        }
    }

    pub fn is_valid(&self, record: &RawRecord) -> bool {
        (self.validate)(record)
    }
}

impl std::fmt::Debug for SheetSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SheetSchema")
            .field("sheet", &self.sheet)
            .field("fields", &self.fields.len())
            .finish_non_exhaustive()
    }
}

/// Schemas for every sheet the repair engine manages, in run order.
pub fn managed_schemas(names: &SheetNames) -> Vec<SheetSchema> {
    vec![
        SheetSchema::new(&names.goals, GoalRecord::FIELDS, validate_goal),
        SheetSchema::new(&names.tasks, TaskRecord::FIELDS, validate_task),
        SheetSchema::new(&names.logs, LogRecord::FIELDS, validate_log),
        SheetSchema::new(&names.sessions, SessionEvent::FIELDS, validate_session),
    ]
}

fn is_date(value: &str) -> bool {
    parse_timestamp(value).is_some()
}

fn non_empty(value: &str) -> bool {
    !value.trim().is_empty()
}

fn has_prefix(value: &str, prefixes: &[&str]) -> bool {
    let value = value.trim();
    prefixes.iter().any(|p| value.starts_with(p))
}

pub fn validate_goal(r: &RawRecord) -> bool {
    has_prefix(r.get("id"), &["g_"])
        && non_empty(r.get("title"))
        && GoalStatus::parse(r.get("status")).is_some()
        && is_date(r.get("createdAt"))
        && is_date(r.get("updatedAt"))
}

pub fn validate_task(r: &RawRecord) -> bool {
    let priority = r.get("priority").trim();
    let due = r.get("dueDate").trim();

    has_prefix(r.get("id"), &["t_"])
        && non_empty(r.get("description"))
        && TaskStatus::parse(r.get("status")).is_some()
        && (priority.is_empty() || Priority::parse(priority).is_some())
        && is_date(r.get("assignedAt"))
        && (due.is_empty() || is_date(due))
}

pub fn validate_log(r: &RawRecord) -> bool {
    has_prefix(r.get("id"), &["l_", "daily_"])
        && is_date(r.get("timestamp"))
        && non_empty(r.get("userId"))
        && non_empty(r.get("rawText"))
}

pub fn validate_session(r: &RawRecord) -> bool {
    has_prefix(r.get("sessionId"), &["session_"])
        && non_empty(r.get("userId"))
        && EventType::parse(r.get("type").trim()).is_some()
        && is_date(r.get("timestamp"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(fields: &'static [FieldSpec], values: &[&str]) -> RawRecord {
        let row: Vec<String> = values.iter().map(|s| s.to_string()).collect();
        RawRecord::read_legacy(&row, fields).trimmed()
    }

    #[test]
    fn test_task_validator() {
        let ok = raw(
            TaskRecord::FIELDS,
            &["t_1", "", "walk", "todo", "", "b", "2024-01-01T00:00:00Z", ""],
        );
        assert!(validate_task(&ok));

        let shifted = raw(
            TaskRecord::FIELDS,
            &["", "t_1", "", "walk", "todo", "", "B", "2024-01-01T00:00:00Z"],
        );
        assert!(!validate_task(&shifted));

        let bad_due = raw(
            TaskRecord::FIELDS,
            &["t_1", "", "walk", "todo", "someday", "", "2024-01-01", ""],
        );
        assert!(!validate_task(&bad_due));

        let bad_priority = raw(
            TaskRecord::FIELDS,
            &["t_1", "", "walk", "todo", "", "D", "2024-01-01", ""],
        );
        assert!(!validate_task(&bad_priority));
    }

    #[test]
    fn test_goal_validator() {
        let ok = raw(
            GoalRecord::FIELDS,
            &["g_1", "read", "0.5", "Approved", "2024-01-01", "2024-01-02T10:00:00"],
        );
        assert!(validate_goal(&ok));

        let blank_status = raw(
            GoalRecord::FIELDS,
            &["g_1", "read", "0.5", "", "2024-01-01", "2024-01-02"],
        );
        assert!(!validate_goal(&blank_status));
    }

    #[test]
    fn test_log_validator_accepts_daily_prefix() {
        let ok = raw(
            LogRecord::FIELDS,
            &["daily_20240101", "2024-01-01T00:00:00Z", "u1", "did things"],
        );
        assert!(validate_log(&ok));

        let no_text = raw(LogRecord::FIELDS, &["l_1", "2024-01-01T00:00:00Z", "u1", " "]);
        assert!(!validate_log(&no_text));
    }

    #[test]
    fn test_session_validator() {
        let ok = raw(
            SessionEvent::FIELDS,
            &["session_1_abcd", "u1", "morning_order", "t_1", "2024-01-01T00:00:00Z"],
        );
        assert!(validate_session(&ok));

        let bad_type = raw(
            SessionEvent::FIELDS,
            &["session_1_abcd", "u1", "chat", "", "2024-01-01T00:00:00Z"],
        );
        assert!(!validate_session(&bad_type));
    }

    #[test]
    fn test_managed_schemas_follow_configured_names() {
        let names = SheetNames {
            tasks: "Tasks v2".into(),
            ..SheetNames::default()
        };
        let sheets: Vec<String> = managed_schemas(&names)
            .into_iter()
            .map(|s| s.sheet)
            .collect();
        assert_eq!(sheets, vec!["goals", "Tasks v2", "logs", "sessions"]);
    }
}
