//! Shared types for the relay server.
//!
//! This module defines:
//! - `WsWriter`: the write half of an upgraded socket
//! - `AppState`: what every handler needs, cloned into each request

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures::stream::SplitSink;
use relay_core::{Dispatcher, MessageStore, Registry};

use crate::config::Config;

/// Write half of an accepted WebSocket.
pub type WsWriter = SplitSink<WebSocket, Message>;

/// Shared application state passed to handlers via axum's `State`.
#[derive(Clone)]
pub struct AppState {
    /// Registry + store; every receive loop dispatches through this.
    pub dispatcher: Dispatcher,

    /// Upgrade requests beyond this many live connections get 503.
    pub max_clients: usize,

    /// `0` = inline writes, otherwise the per-connection queue capacity.
    pub outbound_queue: usize,
}

impl AppState {
    pub fn new(store: Arc<dyn MessageStore>, config: &Config) -> Self {
        AppState {
            dispatcher: Dispatcher::new(Arc::new(Registry::new()), store),
            max_clients: config.max_clients,
            outbound_queue: config.outbound_queue,
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        self.dispatcher.registry()
    }
}
