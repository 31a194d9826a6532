//! Pure projection of ledger events into sessions.
//!
//! Nothing here touches the store. Given the same entries, every function
//! returns the same answer.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ledger::{EventType, LedgerEntry, SessionEvent};

/// Conversational mode, fixed by the session's `start` event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    #[default]
    Log,
    Daily,
    System,
}

impl SessionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionMode::Log => "log",
            SessionMode::Daily => "daily",
            SessionMode::System => "system",
        }
    }

    /// Value written into the `start` event's meta.
    pub fn encode_meta(&self) -> String {
        serde_json::json!({ "mode": self.as_str() }).to_string()
    }
}

impl std::fmt::Display for SessionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SessionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "log" => Ok(SessionMode::Log),
            "daily" => Ok(SessionMode::Daily),
            "system" => Ok(SessionMode::System),
            other => Err(format!("unknown session mode: {}", other)),
        }
    }
}

#[derive(Deserialize)]
struct ModeMeta {
    mode: Option<serde_json::Value>,
}

/// Decode a `start` event's meta.
///
/// Structured meta is trusted when it parses; anything else falls back to a
/// substring check on the raw text.
pub fn parse_mode(meta: Option<&str>) -> SessionMode {
    let Some(meta) = meta.filter(|m| !m.is_empty()) else {
        return SessionMode::Log;
    };

    match serde_json::from_str::<ModeMeta>(meta) {
        Ok(parsed) => match parsed.mode.as_ref().and_then(|m| m.as_str()) {
            Some("daily") => SessionMode::Daily,
            Some("system") => SessionMode::System,
            _ => SessionMode::Log,
        },
        Err(_) => {
            if meta.contains("daily") {
                SessionMode::Daily
            } else if meta.contains("system") {
                SessionMode::System
            } else {
                SessionMode::Log
            }
        }
    }
}

/// All events of one session in replay order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionTranscript {
    pub session_id: String,
    pub user_id: String,
    pub events: Vec<SessionEvent>,
}

impl SessionTranscript {
    pub fn new(session_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            user_id: user_id.into(),
            events: Vec::new(),
        }
    }

    /// Mirror a just-appended event into this in-memory transcript.
    pub fn push(&mut self, event: SessionEvent) {
        self.events.push(event);
    }

    pub fn is_closed(&self) -> bool {
        self.events.iter().any(|e| e.event_type == EventType::End)
    }

    pub fn start_event(&self) -> Option<&SessionEvent> {
        self.events.iter().find(|e| e.event_type == EventType::Start)
    }

    pub fn last_event(&self) -> Option<&SessionEvent> {
        self.events.last()
    }

    pub fn mode(&self) -> SessionMode {
        session_mode(self)
    }
}

/// Mode of a session; `log` when there is no `start` event.
pub fn session_mode(transcript: &SessionTranscript) -> SessionMode {
    parse_mode(transcript.start_event().and_then(|e| e.meta.as_deref()))
}

/// Unparseable timestamps compare as `None`, which orders before any date.
type OrderKey = (Option<DateTime<Utc>>, usize);

fn order_key(entry: &LedgerEntry) -> OrderKey {
    (entry.event.parsed_timestamp(), entry.position)
}

/// Group entries by session, sort each session's events by timestamp, and
/// sort sessions by their last event, oldest first.
///
/// Equal timestamps keep ledger order, both inside a session and between
/// sessions.
pub fn replay(entries: &[LedgerEntry]) -> Vec<SessionTranscript> {
    let mut ordered: Vec<&LedgerEntry> = entries.iter().collect();
    ordered.sort_by_key(|e| e.position);

    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<Vec<&LedgerEntry>> = Vec::new();
    for entry in ordered {
        let slot = *index
            .entry(entry.event.session_id.as_str())
            .or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
        groups[slot].push(entry);
    }

    let mut sessions: Vec<(OrderKey, SessionTranscript)> = groups
        .into_iter()
        .filter_map(|mut group| {
            group.sort_by_key(|e| e.event.parsed_timestamp());
            let last = order_key(group.last()?);
            let first = &group[0].event;
            let transcript = SessionTranscript {
                session_id: first.session_id.clone(),
                user_id: first.user_id.clone(),
                events: group.into_iter().map(|e| e.event.clone()).collect(),
            };
            Some((last, transcript))
        })
        .collect();

    sessions.sort_by(|a, b| a.0.cmp(&b.0));
    sessions.into_iter().map(|(_, t)| t).collect()
}

/// Most recently touched session that has no `end` event.
pub fn active_session(sessions: &[SessionTranscript]) -> Option<&SessionTranscript> {
    sessions.iter().rev().find(|s| !s.is_closed())
}

/// Latest `morning_order` event across every session.
pub fn latest_morning_order(entries: &[LedgerEntry]) -> Option<&SessionEvent> {
    entries
        .iter()
        .filter(|e| e.event.event_type == EventType::MorningOrder)
        .max_by_key(|e| order_key(e))
        .map(|e| &e.event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn entry(position: usize, session: &str, kind: EventType, ts: &str) -> LedgerEntry {
        LedgerEntry {
            position,
            event: SessionEvent::new(session, "u1", kind, kind.as_str()).with_timestamp(ts),
        }
    }

    #[test]
    fn test_parse_mode_json() {
        assert_eq!(parse_mode(Some(r#"{"mode":"daily"}"#)), SessionMode::Daily);
        assert_eq!(parse_mode(Some(r#"{"mode":"system"}"#)), SessionMode::System);
        assert_eq!(parse_mode(Some(r#"{"mode":"log"}"#)), SessionMode::Log);
        // valid JSON wins over the substring heuristic
        assert_eq!(parse_mode(Some(r#"{"note":"daily"}"#)), SessionMode::Log);
    }

    #[test]
    fn test_parse_mode_fallbacks() {
        assert_eq!(parse_mode(None), SessionMode::Log);
        assert_eq!(parse_mode(Some("")), SessionMode::Log);
        assert_eq!(parse_mode(Some("mode=daily")), SessionMode::Daily);
        assert_eq!(parse_mode(Some("system;daily")), SessionMode::Daily);
        assert_eq!(parse_mode(Some("system-run")), SessionMode::System);
        assert_eq!(parse_mode(Some("{broken")), SessionMode::Log);
    }

    #[test]
    fn test_encode_meta_parses_back() {
        for mode in [SessionMode::Log, SessionMode::Daily, SessionMode::System] {
            assert_eq!(parse_mode(Some(&mode.encode_meta())), mode);
        }
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("Daily".parse::<SessionMode>(), Ok(SessionMode::Daily));
        assert!("weekly".parse::<SessionMode>().is_err());
    }

    #[test]
    fn test_replay_groups_and_orders() {
        let entries = vec![
            entry(0, "s1", EventType::Start, "2024-01-01T00:00:00Z"),
            entry(1, "s2", EventType::Start, "2024-01-01T00:01:00Z"),
            entry(2, "s1", EventType::User, "2024-01-01T00:02:00Z"),
            entry(3, "s2", EventType::End, "2024-01-01T00:03:00Z"),
        ];
        let sessions = replay(&entries);
        assert_eq!(sessions.len(), 2);
        // s1 last touched at 00:02, s2 at 00:03
        assert_eq!(sessions[0].session_id, "s1");
        assert_eq!(sessions[1].session_id, "s2");
        assert!(sessions[1].is_closed());
        assert_eq!(active_session(&sessions).unwrap().session_id, "s1");
    }

    #[test]
    fn test_replay_sorts_events_within_session() {
        let entries = vec![
            entry(0, "s1", EventType::User, "2024-01-01T00:05:00Z"),
            entry(1, "s1", EventType::Start, "2024-01-01T00:00:00Z"),
        ];
        let sessions = replay(&entries);
        assert_eq!(sessions[0].events[0].event_type, EventType::Start);
    }

    #[test]
    fn test_equal_timestamps_keep_ledger_order() {
        let ts = "2024-01-01T00:00:00Z";
        let entries = vec![
            entry(0, "s1", EventType::Start, ts),
            entry(1, "s2", EventType::Start, ts),
            entry(2, "s1", EventType::User, ts),
        ];
        let sessions = replay(&entries);
        assert_eq!(sessions[0].session_id, "s2");
        assert_eq!(sessions[1].session_id, "s1");
        assert_eq!(sessions[1].events[1].event_type, EventType::User);
    }

    #[test]
    fn test_unparseable_timestamp_orders_first() {
        let entries = vec![
            entry(0, "s1", EventType::Start, "2024-01-01T00:00:00Z"),
            entry(1, "s2", EventType::Start, "garbage"),
        ];
        let sessions = replay(&entries);
        assert_eq!(sessions[0].session_id, "s2");
        assert_eq!(active_session(&sessions).unwrap().session_id, "s1");
    }

    #[test]
    fn test_no_active_session_when_all_closed() {
        let entries = vec![
            entry(0, "s1", EventType::Start, "2024-01-01T00:00:00Z"),
            entry(1, "s1", EventType::End, "2024-01-01T00:01:00Z"),
        ];
        assert!(active_session(&replay(&entries)).is_none());
    }

    #[test]
    fn test_latest_morning_order_tie_goes_to_later_row() {
        let ts = "2024-01-01T07:00:00Z";
        let mut first = entry(0, "s1", EventType::MorningOrder, ts);
        first.event.content = "t_1".into();
        let mut second = entry(5, "s2", EventType::MorningOrder, ts);
        second.event.content = "t_2".into();
        let mut older = entry(9, "s3", EventType::MorningOrder, "2023-12-31T07:00:00Z");
        older.event.content = "t_0".into();

        let entries = vec![first, second, older];
        assert_eq!(latest_morning_order(&entries).unwrap().content, "t_2");
    }

    #[test]
    fn test_session_mode_without_start_is_log() {
        let transcript = SessionTranscript::new("s1", "u1");
        assert_eq!(session_mode(&transcript), SessionMode::Log);
    }

    fn arb_entries() -> impl Strategy<Value = Vec<LedgerEntry>> {
        prop::collection::vec((0usize..4, 0usize..10, 0usize..4), 0..30).prop_map(|raw| {
            raw.into_iter()
                .enumerate()
                .map(|(position, (session, minute, kind))| {
                    let kind = [
                        EventType::Start,
                        EventType::User,
                        EventType::End,
                        EventType::MorningOrder,
                    ][kind];
                    let mut e = entry(
                        position,
                        &format!("s{}", session),
                        kind,
                        &format!("2024-01-01T00:0{}:00Z", minute),
                    );
                    if kind == EventType::Start {
                        let mode = [SessionMode::Log, SessionMode::Daily, SessionMode::System]
                            [minute % 3];
                        e.event.meta = Some(mode.encode_meta());
                    }
                    e
                })
                .collect()
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn prop_replay_ignores_input_order(entries in arb_entries()) {
            let mut reversed = entries.clone();
            reversed.reverse();
            prop_assert_eq!(replay(&entries), replay(&reversed));
        }

        #[test]
        fn prop_mode_fixed_by_start(entries in arb_entries()) {
            let before: Vec<_> = replay(&entries).iter().map(|s| (s.session_id.clone(), s.mode())).collect();
            let mut extended = entries.clone();
            let next = extended.len();
            for (offset, (id, _)) in before.iter().enumerate() {
                extended.push(entry(next + offset, id, EventType::User, "2024-01-01T00:09:59Z"));
            }
            let after: Vec<_> = replay(&extended).iter().map(|s| (s.session_id.clone(), s.mode())).collect();
            for pair in &before {
                prop_assert!(after.contains(pair));
            }
        }

        #[test]
        fn prop_every_event_lands_in_one_session(entries in arb_entries()) {
            let total: usize = replay(&entries).iter().map(|s| s.events.len()).sum();
            prop_assert_eq!(total, entries.len());
        }
    }
}
