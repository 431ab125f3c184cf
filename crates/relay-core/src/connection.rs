//! Connection handles.
//!
//! A [`Connection`] is a cheap, clonable handle around a shared
//! [`MessageSink`]. Its identity is the address of that shared sink, so
//! every clone of one handle compares equal and two live sinks never
//! collide. The registry keys on this identity; nothing assigns IDs.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::SendError;
use crate::message::ChatMessage;

/// The write side of one client connection.
///
/// Implemented by the server for a WebSocket write half (inline writes)
/// and for a bounded outbound queue (queued writes).
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Deliver one message. Any error marks the connection dead.
    async fn send(&self, msg: &ChatMessage) -> Result<(), SendError>;

    /// Release the underlying handle. Must be safe to call more than once.
    async fn close(&self);
}

/// Identity of a connection, derived from its sink allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(usize);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{:x}", self.0)
    }
}

/// Handle to one live client connection.
#[derive(Clone)]
pub struct Connection {
    sink: Arc<dyn MessageSink>,
}

impl Connection {
    pub fn new<S>(sink: S) -> Self
    where
        S: MessageSink + 'static,
    {
        Connection {
            sink: Arc::new(sink),
        }
    }

    /// Wrap an already shared sink. The caller may keep its own `Arc`
    /// (tests do, to inspect what was delivered).
    pub fn from_arc(sink: Arc<dyn MessageSink>) -> Self {
        Connection { sink }
    }

    pub fn id(&self) -> ConnectionId {
        // Drop the vtable half of the fat pointer; the data address is
        // stable for as long as any clone of this handle is alive.
        ConnectionId(Arc::as_ptr(&self.sink) as *const () as usize)
    }

    pub async fn send(&self, msg: &ChatMessage) -> Result<(), SendError> {
        self.sink.send(msg).await
    }

    pub async fn close(&self) {
        self.sink.close().await
    }
}

impl PartialEq for Connection {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Connection {}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Connection").field(&self.id()).finish()
    }
}
