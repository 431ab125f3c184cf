//! Error types for the relay core.
//!
//! Both errors are handled locally by the dispatcher (logged, then the
//! dispatch or the recipient is dropped); neither ever reaches a client.

use thiserror::Error;

/// Delivery to one connection failed. The connection is considered dead.
#[derive(Debug, Error)]
pub enum SendError {
    /// The peer or its writer has already gone away.
    #[error("connection closed")]
    Closed,

    /// Queued mode only: the recipient's outbound queue is full.
    #[error("outbound queue full")]
    QueueFull,

    /// The underlying transport reported a write error.
    #[error("transport error: {0}")]
    Transport(String),
}

/// The persistence collaborator rejected a message.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),
}
