//! Per-connection receive loop.
//!
//! Lifecycle: the upgrade completes -> the write half becomes this
//! connection's sink and the connection joins the registry -> each
//! inbound frame is decoded and dispatched inline -> any read failure
//! (or an eviction by some other task's broadcast) ends the loop, and
//! the connection leaves the registry and is closed.

use std::fmt;

use axum::extract::ws::{Message, WebSocket};
use chrono::Utc;
use futures::StreamExt;
use relay_core::Connection;
use relay_protocol::{decode_message, ProtocolError};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::sink::{InlineSink, QueuedSink};
use crate::types::AppState;

/// Why a session ended.
enum Exit {
    ClientClosed,
    StreamEnded,
    /// A broadcast failed to write to us (or our writer task died).
    Evicted,
    ReadError(axum::Error),
    BadFrame(ProtocolError),
}

impl Exit {
    fn is_failure(&self) -> bool {
        matches!(self, Exit::ReadError(_) | Exit::BadFrame(_) | Exit::Evicted)
    }
}

impl fmt::Display for Exit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Exit::ClientClosed => write!(f, "client sent close"),
            Exit::StreamEnded => write!(f, "stream ended"),
            Exit::Evicted => write!(f, "write failed"),
            Exit::ReadError(e) => write!(f, "read error: {}", e),
            Exit::BadFrame(e) => write!(f, "{}", e),
        }
    }
}

/// Run one client connection until it closes.
pub async fn run_session(socket: WebSocket, state: AppState) {
    let (writer, mut reader) = socket.split();
    let closed = CancellationToken::new();

    let conn = if state.outbound_queue > 0 {
        Connection::new(QueuedSink::spawn(writer, state.outbound_queue, closed.clone()))
    } else {
        Connection::new(InlineSink::new(writer, closed.clone()))
    };
    let id = conn.id();

    let registry = state.registry().clone();
    registry.add(conn.clone()).await;
    info!(conn = %id, "client connected");

    let exit = loop {
        let frame = tokio::select! {
            _ = closed.cancelled() => break Exit::Evicted,
            frame = reader.next() => frame,
        };

        let frame = match frame {
            Some(Ok(frame)) => frame,
            Some(Err(e)) => break Exit::ReadError(e),
            None => break Exit::StreamEnded,
        };

        let decoded = match &frame {
            Message::Text(text) => decode_message(text.as_str().as_bytes(), Utc::now()),
            Message::Binary(data) => decode_message(data, Utc::now()),
            // Control frames are answered by the socket layer.
            Message::Ping(_) | Message::Pong(_) => continue,
            Message::Close(_) => break Exit::ClientClosed,
        };

        match decoded {
            Ok(msg) => state.dispatcher.dispatch(&msg).await,
            Err(e) => break Exit::BadFrame(e),
        }
    };

    registry.remove(&conn).await;
    conn.close().await;

    if exit.is_failure() {
        warn!(conn = %id, reason = %exit, "client dropped");
    } else {
        info!(conn = %id, reason = %exit, "client disconnected");
    }
}
