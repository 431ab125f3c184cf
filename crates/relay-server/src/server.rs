//! HTTP listener and top-level server wiring.
//!
//! This module:
//! - Opens the message store.
//! - Builds the shared registry + dispatcher.
//! - Serves `GET /ws` (upgrade to a chat session) and `GET /health`.
//!
//! Per-connection logic lives in `session`.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::config::Config;
use crate::session;
use crate::store::SqliteStore;
use crate::types::AppState;

/// Build the router. Exposed so tests can serve it on their own listener.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_upgrade))
        .route("/health", get(health))
        .with_state(state)
}

/// GET /ws
///
/// Any origin is accepted. Refused with 503 once `max_clients` sessions
/// are live; the check is advisory, so a burst of concurrent upgrades can
/// overshoot it slightly.
async fn ws_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    let current = state.registry().len().await;
    if current >= state.max_clients {
        warn!(
            current,
            max_clients = state.max_clients,
            "rejecting connection: max_clients reached"
        );
        return (StatusCode::SERVICE_UNAVAILABLE, "too many clients").into_response();
    }

    ws.on_failed_upgrade(|e| warn!(error = %e, "websocket upgrade failed"))
        .on_upgrade(move |socket| session::run_session(socket, state))
}

/// GET /health
async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let connections = state.registry().len().await;
    Json(json!({ "status": "ok", "connections": connections }))
}

/// Run the relay with the given configuration until Ctrl-C.
pub async fn run(config: Config) -> Result<()> {
    let store = SqliteStore::open(&config.database_url, config.db_max_connections)
        .await
        .context("opening message store")?;
    info!(url = %config.database_url, "message store ready");

    let state = AppState::new(Arc::new(store), &config);

    let addr = config.socket_addr_string();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!(%addr, "listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving")?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c; running until killed");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested, no longer accepting connections");
}
