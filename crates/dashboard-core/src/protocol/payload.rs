//! Payload decoders for the two encoded content types.
//!
//! - `text/html;base64` carries a base64-encoded UTF-8 HTML fragment.
//! - `application/json` carries a JSON document; the fields the dashboard
//!   understands are `name`, `status`, `type` and `data`.

use base64::alphabet;
use base64::engine::general_purpose::GeneralPurpose;
use base64::engine::{DecodePaddingMode, GeneralPurposeConfig};
use base64::Engine;
use serde_json::Value;

use crate::domain::content_type::ContentType;
use crate::protocol::envelope::DecodeError;

/// Standard alphabet, padding optional.  Publishers are inconsistent about
/// trailing `=`.
const LENIENT_STANDARD: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decodes a base64 markup payload into its UTF-8 HTML text.
///
/// Surrounding whitespace is ignored.
///
/// # Errors
///
/// [`DecodeError::InvalidBase64`] if the input is not base64 or the decoded
/// bytes are not UTF-8.
pub fn decode_markup(data: &str) -> Result<String, DecodeError> {
    let bytes = LENIENT_STANDARD
        .decode(data.trim())
        .map_err(|e| DecodeError::InvalidBase64(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| DecodeError::InvalidBase64(format!("not UTF-8: {e}")))
}

/// Encodes markup the way publishers do.  Used by tests and benches.
pub fn encode_markup(html: &str) -> String {
    LENIENT_STANDARD.encode(html.as_bytes())
}

/// The fields of a structured payload the dashboard understands.
///
/// Every field is optional.  `data` keeps the raw JSON value; an explicit
/// `null` counts as present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructuredPayload {
    /// Name of the system message or data point.
    pub name: Option<String>,
    /// Status reported alongside the value (e.g. `"ok"`).
    pub status: Option<String>,
    /// Content type of a nested payload, e.g. `"text/html;base64"`.
    pub content_type: Option<String>,
    /// The value itself.
    pub data: Option<Value>,
}

impl StructuredPayload {
    /// Extracts the known fields from an already parsed value.
    ///
    /// Non-object values yield an empty payload.  Non-string `name`, `status`
    /// and `type` fields are ignored.
    pub fn from_value(value: Value) -> Self {
        let Value::Object(mut fields) = value else {
            return Self::default();
        };
        let string_field = |v: Option<Value>| match v {
            Some(Value::String(s)) => Some(s),
            _ => None,
        };
        Self {
            name: string_field(fields.remove("name")),
            status: string_field(fields.remove("status")),
            content_type: string_field(fields.remove("type")),
            data: fields.remove("data"),
        }
    }

    /// `true` if the nested `type` names base64 markup.
    pub fn carries_markup(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|t| ContentType::parse(t) == ContentType::TextHtmlBase64)
    }

    /// Text of `data` for display: strings verbatim, other values as JSON.
    pub fn data_text(&self) -> Option<String> {
        self.data.as_ref().map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

/// Parses a structured payload.
///
/// # Errors
///
/// [`DecodeError::InvalidJson`] if `data` is not a JSON document.
pub fn decode_structured(data: &str) -> Result<StructuredPayload, DecodeError> {
    let value: Value =
        serde_json::from_str(data).map_err(|e| DecodeError::InvalidJson(e.to_string()))?;
    Ok(StructuredPayload::from_value(value))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
