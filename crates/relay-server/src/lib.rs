//! relay-server
//!
//! WebSocket front end for the chat relay: config, message store,
//! `/ws` endpoint, and the per-connection receive loop.

pub mod config;
pub mod server;
pub mod store;
pub mod types;

// these are internal modules, not re-exported
mod session;
mod sink;
