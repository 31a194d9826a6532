//! CLI output - human-readable tables or one JSON document per command.

use std::io::{self, Write};

use anyhow::Result;
use serde::Serialize;

use crate::ledger::SessionEvent;
use crate::records::TaskRecord;
use crate::repair::SheetRepairReport;
use crate::session::SessionTranscript;

/// Print `value` as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let mut out = io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}

pub fn print_repair_reports(reports: &[SheetRepairReport], apply: bool, json: bool) -> Result<()> {
    if json {
        return print_json(&serde_json::json!({
            "apply": apply,
            "summaries": reports,
        }));
    }

    let mut out = io::stdout().lock();
    writeln!(
        out,
        "{:<16} {:>8} {:>8} {:>9} {:>8}  {}",
        "SHEET",
        "SCANNED",
        "ALIGNED",
        if apply { "REPAIRED" } else { "WOULD FIX" },
        "SKIPPED",
        ""
    )?;
    for report in reports {
        writeln!(
            out,
            "{:<16} {:>8} {:>8} {:>9} {:>8}  {}",
            report.sheet,
            report.scanned,
            report.aligned,
            report.repaired,
            report.skipped,
            if report.limited { "(limit reached)" } else { "" }
        )?;
    }
    if !apply {
        writeln!(out, "\nDry run. Re-run with --apply to write repaired rows.")?;
    }
    Ok(())
}

/// Before/after view of one task status change.
#[derive(Debug, Serialize)]
pub struct TaskTransition<'a> {
    pub id: &'a str,
    pub before: &'a str,
    pub after: &'a TaskRecord,
}

pub fn print_task_transition(transition: &TaskTransition<'_>, json: bool) -> Result<()> {
    if json {
        return print_json(transition);
    }
    println!(
        "{}: {} -> {}  ({})",
        transition.id,
        display_or_dash(transition.before),
        transition.after.status,
        transition.after.description
    );
    Ok(())
}

/// Everything `sessions` reports for one user.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionsView<'a> {
    pub user_id: &'a str,
    pub sessions: &'a [SessionTranscript],
    pub active_session_id: Option<&'a str>,
    pub morning_order: Option<&'a SessionEvent>,
}

pub fn print_sessions(view: &SessionsView<'_>, json: bool) -> Result<()> {
    if json {
        return print_json(view);
    }

    let mut out = io::stdout().lock();
    if view.sessions.is_empty() {
        writeln!(out, "No sessions for {}", view.user_id)?;
    }
    for session in view.sessions {
        let marker = if Some(session.session_id.as_str()) == view.active_session_id {
            "*"
        } else {
            " "
        };
        let state = if session.is_closed() { "closed" } else { "open" };
        let last = session
            .last_event()
            .map(|e| e.timestamp.as_str())
            .unwrap_or("-");
        writeln!(
            out,
            "{} {:<32} {:<7} {:<6} {:>4} events  last {}",
            marker,
            session.session_id,
            session.mode().as_str(),
            state,
            session.events.len(),
            last
        )?;
    }
    if let Some(order) = view.morning_order {
        writeln!(
            out,
            "\nMorning order: {} (at {})",
            display_or_dash(order.content.trim()),
            order.timestamp
        )?;
    }
    Ok(())
}

fn display_or_dash(value: &str) -> &str {
    if value.is_empty() {
        "-"
    } else {
        value
    }
}
