//! Chat message model.
//!
//! This is the **logical** message; the JSON envelope that carries it
//! over the socket lives in the `relay-protocol` crate.

use chrono::{DateTime, Utc};

/// One chat message, as received from a client and fanned out to all.
///
/// Fields are private: a message is immutable once built, and the
/// dispatcher hands the same value to the store and to every recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    user_id: i64,
    content: String,
    time: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(user_id: i64, content: impl Into<String>, time: DateTime<Utc>) -> Self {
        ChatMessage {
            user_id,
            content: content.into(),
            time,
        }
    }

    /// Sender identity as claimed by the client. Not authenticated.
    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Timestamp carried by the envelope (or stamped on receipt).
    pub fn time(&self) -> DateTime<Utc> {
        self.time
    }
}
