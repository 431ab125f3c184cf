//! relay-protocol
//!
//! Wire-level encoding/decoding for the chat relay.
//!
//! One JSON object per WebSocket frame, both directions:
//!
//! ```text
//! { "UserID": 1, "Content": "hi", "Time": "2024-03-01T12:00:00Z" }
//! ```
//!
//! - [`envelope`]   : the serde-facing envelope type
//! - [`json_codec`] : frame bytes <-> `relay_core::ChatMessage`

pub mod envelope;
pub mod json_codec;

pub use envelope::Envelope;
pub use json_codec::{decode_message, encode_message, ProtocolError};
