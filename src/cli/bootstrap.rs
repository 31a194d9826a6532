//! CLI bootstrap - logging, settings and the storage context.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::settings::{CoachbotSettings, SettingsManager};
use crate::state::{AppState, SheetNames};

use super::args::Args;

/// Everything a command needs, owned by the CLI process.
pub struct CliContext {
    /// Settings manager
    pub settings_manager: Arc<SettingsManager>,

    /// Settings snapshot taken at startup
    pub settings: CoachbotSettings,

    /// Store, column cache and sheet names
    pub state: AppState,

    /// Command-line arguments
    pub args: Args,
}

/// Initialize logging, settings and the backing store.
pub async fn initialize(args: &Args) -> Result<CliContext> {
    // Install TLS provider (required for rustls 0.23+)
    let _ = rustls::crypto::ring::default_provider().install_default();

    // Load .env file if present
    if let Err(e) = dotenvy::dotenv() {
        // Only warn on errors other than file not found
        if !matches!(e, dotenvy::Error::Io(_)) {
            tracing::warn!("Failed to load .env file: {}", e);
        }
    }

    let settings_manager = Arc::new(
        match &args.config {
            Some(path) => SettingsManager::with_path(path).await,
            None => SettingsManager::new().await,
        }
        .context("Failed to initialize settings manager")?,
    );

    let settings = settings_manager.get().await;

    // --verbose wins over the configured level
    let log_level = if args.verbose {
        "debug"
    } else {
        settings.advanced.log_level.as_str()
    };
    let directive = format!("coachbot={}", log_level)
        .parse()
        .with_context(|| format!("Invalid log level: {}", log_level))?;
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(directive))
        .try_init();

    // Ensure settings file exists (creates template on first run)
    if let Err(e) = settings_manager.ensure_settings_file().await {
        tracing::warn!("Failed to create settings template: {}", e);
    }

    if args.verbose {
        eprintln!(
            "[cli] Settings loaded from {}",
            settings_manager.path().display()
        );
    }

    let state = if args.memory {
        if args.verbose {
            eprintln!("[cli] Using in-memory store");
        }
        AppState::in_memory(SheetNames::from(&settings.sheets))
            .with_repair_limits(settings.repair.clone())
    } else {
        AppState::from_settings(&settings).await?
    };

    Ok(CliContext {
        settings_manager,
        settings,
        state,
        args: args.clone(),
    })
}
