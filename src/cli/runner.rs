//! CLI command execution.
//!
//! Each subcommand is a thin shell over the storage core: build the
//! repository from the context, call it, hand the result to `output`.

use anyhow::{bail, Context, Result};

use crate::records::{TaskStatus, VerifiedUpdate};
use crate::repair::RepairOptions;
use crate::session::replay::replay;
use crate::session::{active_session, latest_morning_order};

use super::args::Command;
use super::bootstrap::CliContext;
use super::output::{
    print_repair_reports, print_sessions, print_task_transition, SessionsView, TaskTransition,
};

/// Dispatch the parsed subcommand.
pub async fn execute(ctx: &CliContext) -> Result<()> {
    match &ctx.args.command {
        Command::Repair {
            apply,
            sheet,
            limit,
        } => run_repair(ctx, *apply, sheet.clone(), *limit).await,
        Command::TaskStatus { task_id, status } => run_task_status(ctx, task_id, *status).await,
        Command::Sessions { user_id } => run_sessions(ctx, user_id).await,
        #[cfg(feature = "server")]
        Command::Serve { port } => run_server(ctx, *port).await,
    }
}

pub async fn run_repair(
    ctx: &CliContext,
    apply: bool,
    sheet: Option<String>,
    limit: Option<i64>,
) -> Result<()> {
    let options = RepairOptions {
        apply,
        sheet,
        limit: ctx.state.repair_limit(limit.map(|n| n as f64)),
    };

    if ctx.args.verbose {
        eprintln!(
            "[cli] repair apply={} sheet={} limit={}",
            options.apply,
            options.sheet.as_deref().unwrap_or("<all>"),
            options.limit
        );
    }

    let reports = ctx
        .state
        .repair_engine()
        .run(&options)
        .await
        .context("Repair run failed")?;

    print_repair_reports(&reports, options.apply, ctx.args.json)
}

/// Set a task's status, then confirm the sheet actually holds it.
pub async fn run_task_status(ctx: &CliContext, task_id: &str, status: TaskStatus) -> Result<()> {
    let tasks = ctx.state.tasks();

    let Some(before) = tasks.find_by_id(task_id).await? else {
        bail!("Task not found: {}", task_id);
    };

    match tasks.update_status_verified(task_id, status).await? {
        VerifiedUpdate::Applied(after) => print_task_transition(
            &TaskTransition {
                id: task_id,
                before: before.record.status.trim(),
                after: &after,
            },
            ctx.args.json,
        ),
        // Deleted between the lookup and the write
        VerifiedUpdate::NotFound => bail!("Task not found: {}", task_id),
        VerifiedUpdate::Mismatch { expected, actual } => bail!(
            "Status of {} did not stick: expected {}, read back {}",
            task_id,
            expected,
            actual.as_deref().unwrap_or("<missing>")
        ),
    }
}

pub async fn run_sessions(ctx: &CliContext, user_id: &str) -> Result<()> {
    // One ledger read feeds all three views
    let entries = ctx.state.ledger().fetch_all_for_user(user_id).await?;
    let sessions = replay(&entries);
    let active = active_session(&sessions).map(|s| s.session_id.as_str());
    let morning_order = latest_morning_order(&entries);

    print_sessions(
        &SessionsView {
            user_id,
            sessions: &sessions,
            active_session_id: active,
            morning_order,
        },
        ctx.args.json,
    )
}

#[cfg(feature = "server")]
pub async fn run_server(ctx: &CliContext, port: Option<u16>) -> Result<()> {
    let port = port.unwrap_or(ctx.settings.server.port);
    let api_key = crate::settings::get_with_env_fallback(
        &ctx.settings.server.internal_api_key,
        &["INTERNAL_API_KEY"],
        None,
    );
    if api_key.is_none() {
        tracing::warn!("No internal API key configured; repair endpoints will refuse requests");
    }

    let (addr, shutdown) = super::server::start_server(port, ctx.state.clone(), api_key).await?;
    eprintln!("Listening on http://{}", addr);

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;
    tracing::info!("Shutting down");
    shutdown.cancel();
    Ok(())
}
