//! Event types recorded in the session ledger.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::codec::{FieldSpec, SheetRecord};

/// Kinds of ledger events. The set is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// Session opened; `meta` carries the encoded mode
    Start,
    /// Message from the user
    User,
    /// Reply sent to the user
    Assistant,
    /// Session closed
    End,
    /// A log entry was produced from this session (`meta` = log id)
    Analysis,
    /// Tasks picked for the day
    DailyTaskSelection,
    /// Progress report on a daily task
    DailyUpdate,
    /// End-of-day review draft
    DailyReview,
    /// Review changes applied to tasks
    DailyReviewApply,
    /// Pointer to the task chosen for the morning (`content` = task id)
    MorningOrder,
}

impl EventType {
    pub const ALL: [EventType; 10] = [
        EventType::Start,
        EventType::User,
        EventType::Assistant,
        EventType::End,
        EventType::Analysis,
        EventType::DailyTaskSelection,
        EventType::DailyUpdate,
        EventType::DailyReview,
        EventType::DailyReviewApply,
        EventType::MorningOrder,
    ];

    /// Wire name stored in the `type` column
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Start => "start",
            EventType::User => "user",
            EventType::Assistant => "assistant",
            EventType::End => "end",
            EventType::Analysis => "analysis",
            EventType::DailyTaskSelection => "daily_task_selection",
            EventType::DailyUpdate => "daily_update",
            EventType::DailyReview => "daily_review",
            EventType::DailyReviewApply => "daily_review_apply",
            EventType::MorningOrder => "morning_order",
        }
    }

    /// Exact wire-name lookup.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == value)
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current time in the ledger's timestamp format (RFC 3339, millis, `Z`).
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a stored timestamp. Naive forms are read as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f"))
        .map(|naive| naive.and_utc())
        .ok()
        .or_else(|| {
            chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
        })
}

/// One immutable row of the session ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEvent {
    pub session_id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub content: String,
    /// ISO-8601 as written; kept verbatim so replay sees exactly what the
    /// sheet holds
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<String>,
}

impl SessionEvent {
    /// New event stamped with the current time.
    pub fn new(
        session_id: impl Into<String>,
        user_id: impl Into<String>,
        event_type: EventType,
        content: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            user_id: user_id.into(),
            event_type,
            content: content.into(),
            timestamp: now_timestamp(),
            meta: None,
        }
    }

    pub fn with_meta(mut self, meta: impl Into<String>) -> Self {
        self.meta = Some(meta.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = timestamp.into();
        self
    }

    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.timestamp)
    }
}

const SESSION_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("sessionId", &["sessionId", "session_id"], 0),
    FieldSpec::new("userId", &["userId", "user_id"], 1),
    FieldSpec::new("type", &["type"], 2),
    FieldSpec::new("content", &["content"], 3),
    FieldSpec::new("timestamp", &["timestamp"], 4),
    FieldSpec::new("meta", &["meta"], 5),
];

impl SheetRecord for SessionEvent {
    const FIELDS: &'static [FieldSpec] = SESSION_FIELDS;

    fn from_fields(values: &[String]) -> Option<Self> {
        let session_id = values[0].trim();
        if session_id.is_empty() {
            return None;
        }

        // blank or unrecognised types read as a plain user message
        let event_type = EventType::parse(values[2].trim()).unwrap_or(EventType::User);
        let meta = if values[5].is_empty() {
            None
        } else {
            Some(values[5].clone())
        };

        Some(Self {
            session_id: session_id.to_string(),
            user_id: values[1].clone(),
            event_type,
            content: values[3].clone(),
            timestamp: values[4].clone(),
            meta,
        })
    }

    fn to_fields(&self) -> Vec<String> {
        vec![
            self.session_id.clone(),
            self.user_id.clone(),
            self.event_type.as_str().to_string(),
            self.content.clone(),
            self.timestamp.clone(),
            self.meta.clone().unwrap_or_default(),
        ]
    }
}
