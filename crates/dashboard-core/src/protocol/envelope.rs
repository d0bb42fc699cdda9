//! Envelope decoder.
//!
//! Each frame on the data topic carries a JSON body of the shape
//!
//! ```json
//! {"contentType": "text/plain", "data": "42", "timestamp": 1700000000000}
//! ```
//!
//! plus a routing header naming the receiver card.  [`decode_envelope`] checks
//! the outer shape and produces a typed [`Envelope`]; it does not look inside
//! `data`, that is the payload handlers' job.
//!
//! # Wire compatibility
//!
//! - The content type is read from `contentType`, or from the legacy `type`
//!   key when `contentType` is absent.
//! - `timestamp` may be a JSON integer or a decimal string.  Any other shape is
//!   logged and treated as absent; a bad timestamp never rejects a message.
//! - An absent content type is *not* a decode failure.  The envelope reaches
//!   the dispatcher, whose error branch makes it visible on the card.

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

use crate::domain::content_type::ContentType;
use crate::domain::receiver::ReceiverId;

/// Errors raised while decoding an inbound message or one of its payloads.
///
/// None of them is fatal to the session: each is caught for the single
/// message that caused it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// The outer frame is not a JSON object with a string `data` field, or
    /// the routing metadata is missing.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// A structured payload is not valid JSON.
    #[error("invalid JSON payload: {0}")]
    InvalidJson(String),

    /// A markup payload is not valid base64, or does not decode to UTF-8.
    #[error("invalid base64 payload: {0}")]
    InvalidBase64(String),
}

/// A validated inbound message addressed to one receiver.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    /// The card (or dashboard root) this message updates.
    pub receiver_id: ReceiverId,
    /// Normalized content type; `None` when the frame declared none.
    pub content_type: Option<ContentType>,
    /// Raw payload string, possibly base64 or JSON encoded.
    pub data: String,
    /// Epoch milliseconds, when present and well-formed.
    pub timestamp: Option<i64>,
}

impl Envelope {
    /// Builds an envelope directly, e.g. for tests or synthetic messages.
    pub fn new(
        receiver_id: impl Into<ReceiverId>,
        content_type: Option<&str>,
        data: impl Into<String>,
        timestamp: Option<i64>,
    ) -> Self {
        Self {
            receiver_id: receiver_id.into(),
            content_type: content_type.map(ContentType::parse),
            data: data.into(),
            timestamp,
        }
    }
}

/// Decodes a raw frame body plus its routing metadata into an [`Envelope`].
///
/// # Errors
///
/// Returns [`DecodeError::MalformedEnvelope`] if:
///
/// - `receiver_id` is `None` or blank,
/// - `raw` is not valid JSON or not a JSON object,
/// - `data` is missing or not a string,
/// - the content type field is present but not a string.
///
/// # Example
///
/// ```rust
/// use dashboard_core::{decode_envelope, ContentType};
///
/// let env = decode_envelope(r#"{"contentType":"TEXT/PLAIN","data":"42"}"#, Some("card-1")).unwrap();
/// assert_eq!(env.content_type, Some(ContentType::TextPlain));
/// assert_eq!(env.data, "42");
/// ```
pub fn decode_envelope(raw: &str, receiver_id: Option<&str>) -> Result<Envelope, DecodeError> {
    let receiver_id = match receiver_id.map(str::trim) {
        Some(id) if !id.is_empty() => ReceiverId::new(id),
        _ => {
            return Err(DecodeError::MalformedEnvelope(
                "missing receiver id".to_string(),
            ))
        }
    };

    let value: Value = serde_json::from_str(raw)
        .map_err(|e| DecodeError::MalformedEnvelope(format!("frame is not JSON: {e}")))?;
    let Value::Object(fields) = value else {
        return Err(DecodeError::MalformedEnvelope(
            "frame is not a JSON object".to_string(),
        ));
    };

    let content_type = content_type_field(&fields)?;

    let data = match fields.get("data") {
        Some(Value::String(s)) => s.clone(),
        Some(_) => {
            return Err(DecodeError::MalformedEnvelope(
                "`data` is not a string".to_string(),
            ))
        }
        None => return Err(DecodeError::MalformedEnvelope("missing `data`".to_string())),
    };

    let timestamp = fields
        .get("timestamp")
        .and_then(|v| timestamp_field(v, &receiver_id));

    Ok(Envelope {
        receiver_id,
        content_type,
        data,
        timestamp,
    })
}

fn content_type_field(fields: &Map<String, Value>) -> Result<Option<ContentType>, DecodeError> {
    let raw = fields.get("contentType").or_else(|| fields.get("type"));
    match raw {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(ContentType::parse(s))),
        Some(_) => Err(DecodeError::MalformedEnvelope(
            "content type is not a string".to_string(),
        )),
    }
}

fn timestamp_field(value: &Value, receiver_id: &ReceiverId) -> Option<i64> {
    let parsed = match value {
        Value::Null => return None,
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    if parsed.is_none() {
        warn!(receiver = %receiver_id, "ignoring unusable timestamp {value}");
    }
    parsed
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_well_formed_envelope() {
        // Arrange
        let raw = r#"{"contentType":"text/plain","data":"42","timestamp":1700000000000}"#;

        // Act
        let env = decode_envelope(raw, Some("card-1")).unwrap();

        // Assert
        assert_eq!(env.receiver_id, ReceiverId::new("card-1"));
        assert_eq!(env.content_type, Some(ContentType::TextPlain));
        assert_eq!(env.data, "42");
        assert_eq!(env.timestamp, Some(1_700_000_000_000));
    }

    #[test]
    fn test_legacy_type_key_is_accepted() {
        let env = decode_envelope(r#"{"type":"APPLICATION/JSON","data":"{}"}"#, Some("c")).unwrap();
        assert_eq!(env.content_type, Some(ContentType::ApplicationJson));
    }

    #[test]
    fn test_content_type_key_wins_over_legacy_key() {
        let raw = r#"{"contentType":"text/plain","type":"image/jpeg;base64","data":"x"}"#;
        let env = decode_envelope(raw, Some("c")).unwrap();
        assert_eq!(env.content_type, Some(ContentType::TextPlain));
    }

    #[test]
    fn test_absent_content_type_is_not_a_decode_error() {
        // The dispatcher's error branch must see it so it becomes visible.
        let env = decode_envelope(r#"{"data":"x"}"#, Some("c")).unwrap();
        assert_eq!(env.content_type, None);
    }

    #[test]
    fn test_timestamp_as_string_is_parsed() {
        let env = decode_envelope(r#"{"type":"text/plain","data":"x","timestamp":"1234"}"#, Some("c"))
            .unwrap();
        assert_eq!(env.timestamp, Some(1234));
    }

    #[test]
    fn test_unusable_timestamp_is_treated_as_absent() {
        let env = decode_envelope(
            r#"{"type":"text/plain","data":"x","timestamp":"yesterday"}"#,
            Some("c"),
        )
        .unwrap();
        assert_eq!(env.timestamp, None);

        let env = decode_envelope(r#"{"type":"text/plain","data":"x","timestamp":[1]}"#, Some("c"))
            .unwrap();
        assert_eq!(env.timestamp, None);
    }

    #[test]
    fn test_missing_receiver_is_malformed() {
        let err = decode_envelope(r#"{"type":"text/plain","data":"x"}"#, None).unwrap_err();
        assert!(matches!(err, DecodeError::MalformedEnvelope(_)));

        let err = decode_envelope(r#"{"type":"text/plain","data":"x"}"#, Some("  ")).unwrap_err();
        assert!(matches!(err, DecodeError::MalformedEnvelope(_)));
    }

    #[test]
    fn test_non_json_frame_is_malformed() {
        let err = decode_envelope("not json at all", Some("c")).unwrap_err();
        assert!(matches!(err, DecodeError::MalformedEnvelope(_)));
    }

    #[test]
    fn test_non_object_frame_is_malformed() {
        let err = decode_envelope(r#"["text/plain","x"]"#, Some("c")).unwrap_err();
        assert_eq!(
            err,
            DecodeError::MalformedEnvelope("frame is not a JSON object".to_string())
        );
    }

    #[test]
    fn test_missing_or_non_string_data_is_malformed() {
        assert!(decode_envelope(r#"{"type":"text/plain"}"#, Some("c")).is_err());
        assert!(decode_envelope(r#"{"type":"text/plain","data":42}"#, Some("c")).is_err());
    }

    #[test]
    fn test_non_string_content_type_is_malformed() {
        let err = decode_envelope(r#"{"contentType":7,"data":"x"}"#, Some("c")).unwrap_err();
        assert!(matches!(err, DecodeError::MalformedEnvelope(_)));
    }

    #[test]
    fn test_decode_error_messages() {
        assert_eq!(
            DecodeError::InvalidJson("eof".to_string()).to_string(),
            "invalid JSON payload: eof"
        );
        assert_eq!(
            DecodeError::InvalidBase64("bad".to_string()).to_string(),
            "invalid base64 payload: bad"
        );
    }
}
