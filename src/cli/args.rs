//! CLI argument parsing using clap.
//!
//! Defines the command-line interface for coachbot-cli.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::records::TaskStatus;

/// coachbot CLI - administrative access to the spreadsheet store
#[derive(Parser, Debug, Clone)]
#[command(name = "coachbot-cli")]
#[command(version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Settings file (default: ~/.coachbot/settings.toml)
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Use an empty in-memory store instead of Google Sheets
    #[arg(long, global = true)]
    pub memory: bool,

    /// Output results as JSON (for scripting/parsing)
    #[arg(long, global = true)]
    pub json: bool,

    /// Show verbose output (debug information)
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Detect (and optionally fix) rows whose columns drifted from the header
    Repair {
        /// Write repaired rows back (default is a dry run)
        #[arg(long)]
        apply: bool,

        /// Only process this sheet
        #[arg(long)]
        sheet: Option<String>,

        /// Maximum repairs per sheet (clamped to the configured maximum)
        #[arg(long)]
        limit: Option<i64>,
    },

    /// Set a task's status and verify the write
    TaskStatus {
        task_id: String,

        /// todo | done | miss
        status: TaskStatus,
    },

    /// Show a user's sessions, active session and morning order
    Sessions { user_id: String },

    /// Run the internal HTTP server
    #[cfg(feature = "server")]
    Serve {
        /// Port to listen on (default from settings)
        #[arg(short = 'p', long)]
        port: Option<u16>,
    },
}
