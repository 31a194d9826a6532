//! coachbot CLI - administrative access to the spreadsheet store
//!
//! # Usage
//!
//! ```bash
//! # Build the CLI binary
//! cargo build --features cli --bin coachbot-cli
//!
//! # Report drifted rows without writing
//! ./target/debug/coachbot-cli repair
//!
//! # Fix up to 200 rows of the tasks sheet
//! ./target/debug/coachbot-cli repair --apply --sheet tasks --limit 200
//!
//! # Force a task's status and confirm the write
//! ./target/debug/coachbot-cli task-status t_1700000000000_ab12 done
//!
//! # Inspect a user's sessions as JSON
//! ./target/debug/coachbot-cli sessions 123456789 --json | jq .
//!
//! # Internal HTTP endpoint (needs the `server` feature)
//! ./target/debug/coachbot-cli serve --port 8787
//! ```

use anyhow::Result;
use clap::Parser;

use coachbot_lib::cli::{execute, initialize, Args};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let ctx = initialize(&args).await?;

    execute(&ctx).await
}
