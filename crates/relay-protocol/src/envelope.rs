//! The JSON envelope carried in each frame.
//!
//! Field names are the canonical `UserID` / `Content` / `Time`; output
//! always uses them. On input, keys match case-insensitively (`userId`,
//! `CONTENT`, `time` all work) and the snake_case `user_id` is accepted
//! too. Unknown keys are ignored. When a key repeats, the last one wins.
//!
//! A missing or `null` `UserID` is 0 and a missing or `null` `Content` is
//! "". A missing or `null` `Time` is left empty, and the receiver stamps
//! its own clock on the message (see [`Envelope::into_message`]) rather
//! than storing a zero timestamp.

use std::fmt;

use chrono::{DateTime, Utc};
use relay_core::ChatMessage;
use serde::de::{Deserializer, IgnoredAny, MapAccess, Visitor};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Envelope {
    #[serde(rename = "UserID")]
    pub user_id: i64,

    #[serde(rename = "Content")]
    pub content: String,

    #[serde(rename = "Time", skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
}

enum Field {
    UserId,
    Content,
    Time,
    Other,
}

impl Field {
    fn from_key(key: &str) -> Field {
        match key.to_lowercase().as_str() {
            "userid" | "user_id" => Field::UserId,
            "content" => Field::Content,
            "time" => Field::Time,
            _ => Field::Other,
        }
    }
}

struct EnvelopeVisitor;

impl<'de> Visitor<'de> for EnvelopeVisitor {
    type Value = Envelope;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a JSON object with UserID, Content and Time")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Envelope, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut envelope = Envelope {
            user_id: 0,
            content: String::new(),
            time: None,
        };

        // `null` leaves whatever the field already holds.
        while let Some(key) = map.next_key::<String>()? {
            match Field::from_key(&key) {
                Field::UserId => {
                    if let Some(v) = map.next_value::<Option<i64>>()? {
                        envelope.user_id = v;
                    }
                }
                Field::Content => {
                    if let Some(v) = map.next_value::<Option<String>>()? {
                        envelope.content = v;
                    }
                }
                Field::Time => {
                    if let Some(v) = map.next_value::<Option<DateTime<Utc>>>()? {
                        envelope.time = Some(v);
                    }
                }
                Field::Other => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }

        Ok(envelope)
    }
}

impl<'de> Deserialize<'de> for Envelope {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(EnvelopeVisitor)
    }
}

impl Envelope {
    /// Turn the envelope into a message.
    ///
    /// An envelope without a `Time` is stamped with `received_at`, the
    /// server's receive time, so stored and broadcast messages always carry
    /// a real timestamp instead of the zero time.
    pub fn into_message(self, received_at: DateTime<Utc>) -> ChatMessage {
        ChatMessage::new(
            self.user_id,
            self.content,
            self.time.unwrap_or(received_at),
        )
    }
}

impl From<&ChatMessage> for Envelope {
    fn from(msg: &ChatMessage) -> Self {
        Envelope {
            user_id: msg.user_id(),
            content: msg.content().to_string(),
            time: Some(msg.time()),
        }
    }
}
