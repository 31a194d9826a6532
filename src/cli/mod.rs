//! Admin command-line interface for the coachbot store.
//!
//! The CLI runs the same repositories the chatbot uses, against the
//! configured spreadsheet (or an empty in-memory store with `--memory`):
//!
//! ```text
//! +-----------+     +--------------+     +-----------+     +-----------+
//! | args.rs   | --> | bootstrap.rs | --> | runner.rs | --> | output.rs |
//! | (clap)    |     | (AppState)   |     | (repos)   |     | (text/JSON)|
//! +-----------+     +--------------+     +-----------+     +-----------+
//! ```
//!
//! With the `server` feature, `serve` exposes the repair run over HTTP; see
//! [`server`].

mod args;
mod bootstrap;
mod output;
mod runner;

#[cfg(feature = "server")]
pub mod server;

pub use args::{Args, Command};
pub use bootstrap::{initialize, CliContext};
pub use runner::{execute, run_repair, run_sessions, run_task_status};
