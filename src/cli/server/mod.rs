//! Internal HTTP server for administrative repair runs.
//!
//! ```text
//! +----------------------------------------------------+
//! |  Axum HTTP Server                                  |
//! |  /health (GET)                  -> health check    |
//! |  /internal/repair-sheets (POST) -> repair run      |
//! |  /internal/repair-sheets (GET)  -> dry run         |
//! +----------------------------------------------------+
//!          |
//!          v
//! +----------------------------------------------------+
//! |  AppState (store + column cache + sheet names)     |
//! +----------------------------------------------------+
//! ```
//!
//! `/internal/*` requires the shared secret from `server.internal_api_key`
//! (or `INTERNAL_API_KEY`).
//!
//! # Feature Flag
//!
//! This module is only available when the `server` feature is enabled.

mod handlers;
pub mod types;

pub use handlers::ServerState;
pub use types::{ErrorResponse, HealthResponse, RepairRequest, RepairResponse};

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::state::AppState;

/// Start the HTTP server on 127.0.0.1.
///
/// Use port 0 for a random available port. Returns the bound address and a
/// token that triggers graceful shutdown.
///
/// ```ignore
/// let (addr, shutdown) = start_server(8787, state, Some(key)).await?;
/// println!("Server listening on {}", addr);
/// shutdown.cancel();
/// ```
pub async fn start_server(
    port: u16,
    app: AppState,
    internal_api_key: Option<String>,
) -> anyhow::Result<(SocketAddr, CancellationToken)> {
    let (state, shutdown_token) = ServerState::new(app, internal_api_key);

    let router = create_router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    tracing::info!("HTTP server listening on {}", actual_addr);

    let server_shutdown = shutdown_token.clone();
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router)
            .with_graceful_shutdown(server_shutdown.cancelled_owned())
            .await
        {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok((actual_addr, shutdown_token))
}

/// Create the router with all routes configured.
pub fn create_router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/internal/repair-sheets",
            post(handlers::repair_sheets).get(handlers::repair_sheets_dry_run),
        )
        .with_state(state)
}
