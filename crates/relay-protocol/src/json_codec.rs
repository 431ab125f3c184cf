//! JSON encoding/decoding for chat messages.
//!
//! A frame that does not decode is a read failure for the connection
//! that sent it; the caller decides what that means.

use chrono::{DateTime, Utc};
use relay_core::ChatMessage;
use thiserror::Error;

use crate::envelope::Envelope;

#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Payload is not a JSON envelope (bad syntax, wrong field types,
    /// invalid timestamp, or not UTF-8).
    #[error("malformed envelope: {0}")]
    Json(#[from] serde_json::Error),
}

/// Decode one frame payload into a message.
///
/// `received_at` is used when the envelope carries no `Time`.
pub fn decode_message(payload: &[u8], received_at: DateTime<Utc>) -> Result<ChatMessage, ProtocolError> {
    let envelope: Envelope = serde_json::from_slice(payload)?;
    Ok(envelope.into_message(received_at))
}

/// Encode a message as the text of one outbound frame.
pub fn encode_message(msg: &ChatMessage) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(&Envelope::from(msg))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn decodes_canonical_envelope() {
        let raw = br#"{"UserID": 7, "Content": "hello", "Time": "2024-03-01T12:00:00Z"}"#;
        let msg = decode_message(raw, Utc::now()).unwrap();
        assert_eq!(msg, ChatMessage::new(7, "hello", t0()));
    }

    #[test]
    fn normalises_offsets_to_utc() {
        let raw = br#"{"UserID": 1, "Content": "x", "Time": "2024-03-01T15:00:00+03:00"}"#;
        let msg = decode_message(raw, Utc::now()).unwrap();
        assert_eq!(msg.time(), t0());
    }

    #[test]
    fn accepts_snake_case_aliases() {
        let raw = br#"{"user_id": 3, "content": "lower", "time": "2024-03-01T12:00:00Z"}"#;
        let msg = decode_message(raw, Utc::now()).unwrap();
        assert_eq!(msg, ChatMessage::new(3, "lower", t0()));
    }

    #[test]
    fn missing_fields_take_defaults() {
        let msg = decode_message(b"{}", t0()).unwrap();
        assert_eq!(msg, ChatMessage::new(0, "", t0()));
    }

    #[test]
    fn keys_match_case_insensitively() {
        let msg = decode_message(br#"{"userId": 5, "CONTENT": "x"}"#, t0()).unwrap();
        assert_eq!(msg, ChatMessage::new(5, "x", t0()));

        let raw = br#"{"USERID": 6, "content": "y", "tImE": "2024-03-01T12:00:00Z"}"#;
        let msg = decode_message(raw, Utc::now()).unwrap();
        assert_eq!(msg, ChatMessage::new(6, "y", t0()));
    }

    #[test]
    fn unknown_keys_are_ignored_and_last_key_wins() {
        let raw = br#"{"UserID": 1, "Room": {"id": 3}, "userid": 2, "Content": "z"}"#;
        let msg = decode_message(raw, t0()).unwrap();
        assert_eq!(msg, ChatMessage::new(2, "z", t0()));
    }

    #[test]
    fn null_fields_take_defaults() {
        let msg = decode_message(br#"{"UserID": 1, "Content": null}"#, t0()).unwrap();
        assert_eq!(msg, ChatMessage::new(1, "", t0()));

        let msg = decode_message(br#"{"UserID": null, "Content": "a", "Time": null}"#, t0()).unwrap();
        assert_eq!(msg, ChatMessage::new(0, "a", t0()));
    }

    #[test]
    fn rejects_malformed_payloads() {
        assert!(decode_message(b"not json", t0()).is_err());
        assert!(decode_message(br#"{"UserID": "seven"}"#, t0()).is_err());
        assert!(decode_message(br#"{"Time": "yesterday"}"#, t0()).is_err());
        assert!(decode_message(br#"{"content": 12}"#, t0()).is_err());
        assert!(decode_message(br#"[1, "x"]"#, t0()).is_err());
        assert!(decode_message(&[0xff, 0xfe], t0()).is_err());
    }

    #[test]
    fn encodes_canonical_field_names() {
        let text = encode_message(&ChatMessage::new(1, "hi", t0())).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();

        assert_eq!(value["UserID"], 1);
        assert_eq!(value["Content"], "hi");
        let time = value["Time"].as_str().unwrap();
        assert_eq!(DateTime::parse_from_rfc3339(time).unwrap(), t0());
    }
}
