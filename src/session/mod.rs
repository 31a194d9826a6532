//! Session state machine on top of the event ledger.
//!
//! Sessions are never stored directly. Every query fetches the user's events
//! and replays them (see [`replay`]); every command is a single ledger append.
//! There is no locking: callers that read, decide, then write (for example
//! "start only if nothing is active") get best-effort semantics under
//! concurrent requests for the same user.

pub mod replay;

use chrono::Utc;
use uuid::Uuid;

use crate::error::Result;
use crate::ledger::{EventLedger, EventType, SessionEvent};

pub use replay::{
    active_session, latest_morning_order, parse_mode, session_mode, SessionMode,
    SessionTranscript,
};

const START_CONTENT: &str = "session_start";
const END_CONTENT: &str = "session_end";
const ANALYSIS_CONTENT: &str = "analysis_complete";
const SUPERSEDED_META: &str = "superseded";
const MORNING_ORDER_META: &str = "morning_order";

/// `session_<unix millis>_<4 hex chars>`
pub fn new_session_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("session_{}_{}", Utc::now().timestamp_millis(), &suffix[..4])
}

#[derive(Clone)]
pub struct SessionRepository {
    ledger: EventLedger,
}

impl SessionRepository {
    pub fn new(ledger: EventLedger) -> Self {
        Self { ledger }
    }

    pub fn ledger(&self) -> &EventLedger {
        &self.ledger
    }

    /// Open a new session. The returned transcript holds only the start event;
    /// nothing is read back from the store.
    pub async fn start(&self, user_id: &str, mode: SessionMode) -> Result<SessionTranscript> {
        let session_id = new_session_id();
        let event = SessionEvent::new(&session_id, user_id, EventType::Start, START_CONTENT)
            .with_meta(mode.encode_meta());
        self.ledger.append(&event).await?;

        tracing::info!(user_id, session_id = %session_id, mode = %mode, "session started");

        let mut transcript = SessionTranscript::new(session_id, user_id);
        transcript.push(event);
        Ok(transcript)
    }

    async fn record(
        &self,
        session_id: &str,
        user_id: &str,
        event_type: EventType,
        content: &str,
        meta: Option<&str>,
    ) -> Result<SessionEvent> {
        let mut event = SessionEvent::new(session_id, user_id, event_type, content);
        event.meta = meta.map(str::to_string);
        self.ledger.append(&event).await?;
        Ok(event)
    }

    pub async fn append_user_message(
        &self,
        session_id: &str,
        user_id: &str,
        content: &str,
    ) -> Result<SessionEvent> {
        self.record(session_id, user_id, EventType::User, content, None)
            .await
    }

    pub async fn append_assistant_message(
        &self,
        session_id: &str,
        user_id: &str,
        content: &str,
    ) -> Result<SessionEvent> {
        self.record(session_id, user_id, EventType::Assistant, content, None)
            .await
    }

    pub async fn append_daily_update(
        &self,
        session_id: &str,
        user_id: &str,
        payload: &str,
    ) -> Result<SessionEvent> {
        self.record(session_id, user_id, EventType::DailyUpdate, payload, None)
            .await
    }

    pub async fn append_daily_task_selection(
        &self,
        session_id: &str,
        user_id: &str,
        payload: &str,
    ) -> Result<SessionEvent> {
        self.record(session_id, user_id, EventType::DailyTaskSelection, payload, None)
            .await
    }

    pub async fn append_daily_review(
        &self,
        session_id: &str,
        user_id: &str,
        payload: &str,
    ) -> Result<SessionEvent> {
        self.record(session_id, user_id, EventType::DailyReview, payload, None)
            .await
    }

    pub async fn append_daily_review_apply(
        &self,
        session_id: &str,
        user_id: &str,
        payload: &str,
    ) -> Result<SessionEvent> {
        self.record(session_id, user_id, EventType::DailyReviewApply, payload, None)
            .await
    }

    /// Link a session to the log entry produced from it.
    pub async fn mark_analyzed(
        &self,
        session_id: &str,
        user_id: &str,
        log_id: &str,
    ) -> Result<SessionEvent> {
        self.record(
            session_id,
            user_id,
            EventType::Analysis,
            ANALYSIS_CONTENT,
            Some(log_id),
        )
        .await
    }

    /// Close a session. A second `end` is harmless but wasted.
    pub async fn end(
        &self,
        session_id: &str,
        user_id: &str,
        meta: Option<&str>,
    ) -> Result<SessionEvent> {
        let event = self
            .record(session_id, user_id, EventType::End, END_CONTENT, meta)
            .await?;
        tracing::info!(user_id, session_id, "session ended");
        Ok(event)
    }

    /// Every session of the user, least recently touched first.
    pub async fn list_sessions(&self, user_id: &str) -> Result<Vec<SessionTranscript>> {
        let entries = self.ledger.fetch_all_for_user(user_id).await?;
        Ok(replay::replay(&entries))
    }

    pub async fn get_active_session(&self, user_id: &str) -> Result<Option<SessionTranscript>> {
        let mut sessions = self.list_sessions(user_id).await?;
        let Some(idx) = sessions.iter().rposition(|s| !s.is_closed()) else {
            return Ok(None);
        };
        Ok(Some(sessions.swap_remove(idx)))
    }

    /// End whatever is active, then start a fresh session.
    ///
    /// The two writes are sequential. A failure after the `end` leaves the
    /// user with no active session, which the next `begin` handles.
    pub async fn begin(&self, user_id: &str, mode: SessionMode) -> Result<SessionTranscript> {
        if let Some(active) = self.get_active_session(user_id).await? {
            tracing::debug!(
                user_id,
                session_id = %active.session_id,
                "superseding active session"
            );
            self.end(&active.session_id, user_id, Some(SUPERSEDED_META))
                .await?;
        }
        self.start(user_id, mode).await
    }

    /// Record the morning task choice inside its own closed `system` session
    /// so it never shows up as the active session. Three ledger writes.
    pub async fn record_morning_order(&self, user_id: &str, task_id: &str) -> Result<String> {
        let session = self.start(user_id, SessionMode::System).await?;
        self.record(
            &session.session_id,
            user_id,
            EventType::MorningOrder,
            task_id,
            None,
        )
        .await?;
        self.end(&session.session_id, user_id, Some(MORNING_ORDER_META))
            .await?;
        Ok(session.session_id)
    }

    /// Task id of the most recent morning order; `None` when there is none or
    /// the latest one was recorded with an empty task.
    pub async fn find_latest_morning_order_task_id(&self, user_id: &str) -> Result<Option<String>> {
        let entries = self.ledger.fetch_all_for_user(user_id).await?;
        Ok(latest_morning_order(&entries)
            .map(|event| event.content.trim())
            .filter(|task_id| !task_id.is_empty())
            .map(str::to_string))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::codec::ColumnMapCache;
    use crate::store::MemoryStore;

    const HEADER: &[&str] = &["sessionId", "userId", "type", "content", "timestamp", "meta"];

    fn repo() -> (Arc<MemoryStore>, SessionRepository) {
        let store = Arc::new(MemoryStore::new().with_sheet("sessions", &[HEADER]));
        let ledger = EventLedger::new(store.clone(), Arc::new(ColumnMapCache::new()), "sessions");
        (store, SessionRepository::new(ledger))
    }

    #[test]
    fn test_session_id_format() {
        let id = new_session_id();
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "session");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 4);
        assert!(parts[2].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn test_start_writes_mode_meta() {
        let (store, repo) = repo();
        let transcript = repo.start("u1", SessionMode::Daily).await.unwrap();

        assert_eq!(transcript.events.len(), 1);
        assert_eq!(transcript.mode(), SessionMode::Daily);

        let rows = store.rows("sessions");
        assert_eq!(rows[1][0], transcript.session_id);
        assert_eq!(rows[1][2], "start");
        assert_eq!(rows[1][3], "session_start");
        assert_eq!(rows[1][5], r#"{"mode":"daily"}"#);
    }

    #[tokio::test]
    async fn test_mark_analyzed_stores_log_id() {
        let (store, repo) = repo();
        let session = repo.start("u1", SessionMode::Log).await.unwrap();
        repo.mark_analyzed(&session.session_id, "u1", "l_42")
            .await
            .unwrap();

        let row = &store.rows("sessions")[2];
        assert_eq!(row[2], "analysis");
        assert_eq!(row[3], "analysis_complete");
        assert_eq!(row[5], "l_42");
    }

    #[tokio::test]
    async fn test_begin_supersedes_active_session() {
        let (_store, repo) = repo();
        let first = repo.start("u1", SessionMode::Log).await.unwrap();
        let second = repo.begin("u1", SessionMode::Daily).await.unwrap();

        let sessions = repo.list_sessions("u1").await.unwrap();
        let old = sessions
            .iter()
            .find(|s| s.session_id == first.session_id)
            .unwrap();
        assert!(old.is_closed());
        assert_eq!(
            old.last_event().and_then(|e| e.meta.as_deref()),
            Some("superseded")
        );

        let active = repo.get_active_session("u1").await.unwrap().unwrap();
        assert_eq!(active.session_id, second.session_id);
        assert_eq!(active.mode(), SessionMode::Daily);
    }

    #[tokio::test]
    async fn test_morning_order_session_is_closed_system() {
        let (store, repo) = repo();
        let session_id = repo.record_morning_order("u1", "t_9").await.unwrap();

        assert_eq!(store.rows("sessions").len(), 4);
        assert!(repo.get_active_session("u1").await.unwrap().is_none());

        let sessions = repo.list_sessions("u1").await.unwrap();
        assert_eq!(sessions[0].session_id, session_id);
        assert_eq!(sessions[0].mode(), SessionMode::System);
    }

    #[tokio::test]
    async fn test_empty_morning_order_reads_as_none() {
        let (_store, repo) = repo();
        repo.record_morning_order("u1", "t_1").await.unwrap();
        repo.record_morning_order("u1", "  ").await.unwrap();
        assert_eq!(
            repo.find_latest_morning_order_task_id("u1").await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_users_are_isolated() {
        let (_store, repo) = repo();
        repo.start("u1", SessionMode::Log).await.unwrap();
        assert!(repo.get_active_session("u2").await.unwrap().is_none());
        assert!(repo.list_sessions("u2").await.unwrap().is_empty());
    }
}
