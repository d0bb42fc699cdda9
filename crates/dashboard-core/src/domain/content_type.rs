//! Content-type taxonomy and system message names.
//!
//! Servers declare the payload kind with a MIME-like string such as
//! `"text/html;base64"`.  Comparisons are case-insensitive, so every string is
//! upper-cased exactly once here and the rest of the crate matches on enums.

use std::fmt;

/// The four payload kinds the dispatcher knows how to render, plus an explicit
/// catch-all for everything else.
///
/// # Examples
///
/// ```rust
/// use dashboard_core::ContentType;
///
/// assert_eq!(ContentType::parse("Text/Plain"), ContentType::TextPlain);
/// assert!(matches!(ContentType::parse("weird/type"), ContentType::Unrecognized(_)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentType {
    /// `image/jpeg;base64` – base64 JPEG bytes shown as an image.
    ImageJpegBase64,
    /// `text/plain` – display text, sanitized like markup.
    TextPlain,
    /// `text/html;base64` – base64 of a UTF-8 HTML fragment.
    TextHtmlBase64,
    /// `application/json` – a structured payload, see the structured handler.
    ApplicationJson,
    /// Any other declared type.  Holds the string exactly as received.
    Unrecognized(String),
}

impl ContentType {
    /// Upper-cased dispatch key for `image/jpeg;base64`.
    pub const IMAGE_JPEG_BASE64: &'static str = "IMAGE/JPEG;BASE64";
    /// Upper-cased dispatch key for `text/plain`.
    pub const TEXT_PLAIN: &'static str = "TEXT/PLAIN";
    /// Upper-cased dispatch key for `text/html;base64`.
    pub const TEXT_HTML_BASE64: &'static str = "TEXT/HTML;BASE64";
    /// Upper-cased dispatch key for `application/json`.
    pub const APPLICATION_JSON: &'static str = "APPLICATION/JSON";

    /// Normalizes a declared content type into the taxonomy.
    ///
    /// Surrounding whitespace is ignored; comparison is ASCII case-insensitive.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            Self::IMAGE_JPEG_BASE64 => Self::ImageJpegBase64,
            Self::TEXT_PLAIN => Self::TextPlain,
            Self::TEXT_HTML_BASE64 => Self::TextHtmlBase64,
            Self::APPLICATION_JSON => Self::ApplicationJson,
            _ => Self::Unrecognized(raw.to_string()),
        }
    }

    /// Returns the canonical lower-case MIME string.
    pub fn as_mime(&self) -> &str {
        match self {
            Self::ImageJpegBase64 => "image/jpeg;base64",
            Self::TextPlain => "text/plain",
            Self::TextHtmlBase64 => "text/html;base64",
            Self::ApplicationJson => "application/json",
            Self::Unrecognized(raw) => raw,
        }
    }

    /// `true` for the four types the dispatcher has a handler for.
    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized(_))
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_mime())
    }
}

/// Server-originated messages that address the whole dashboard rather than
/// one card.
///
/// They arrive as `application/json` payloads whose `name` field carries one
/// of these values (case-insensitive).  All of them render on the dashboard
/// surface; `OnConnect` additionally reports whether the server link is up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemMessage {
    /// Reply to the connect handshake, carries the start dashboard.
    OnConnect,
    /// Settings form for a card.
    OnEditCardSettings,
    /// Settings form for a command.
    OnEditCommandSettings,
    /// Settings form for a component.
    OnEditComponentSettings,
    /// A card dashboard selected by navigation.
    OnDisplayDashboard,
    /// The command dashboard.
    OnDisplayCommandList,
}

impl SystemMessage {
    /// Maps a payload `name` onto a system message, or `None` for ordinary
    /// per-card updates.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "ONCONNECT" => Some(Self::OnConnect),
            "ONEDITCARDSETTINGS" => Some(Self::OnEditCardSettings),
            "ONEDITCOMMANDSETTINGS" => Some(Self::OnEditCommandSettings),
            "ONEDITCOMPONENTSETTINGS" => Some(Self::OnEditComponentSettings),
            "ONDISPLAYDASHBOARD" => Some(Self::OnDisplayDashboard),
            "ONDISPLAYCOMMANDLIST" => Some(Self::OnDisplayCommandList),
            _ => None,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive_for_all_known_types() {
        assert_eq!(ContentType::parse("IMAGE/JPEG;BASE64"), ContentType::ImageJpegBase64);
        assert_eq!(ContentType::parse("image/jpeg;base64"), ContentType::ImageJpegBase64);
        assert_eq!(ContentType::parse("Text/Plain"), ContentType::TextPlain);
        assert_eq!(ContentType::parse("text/HTML;base64"), ContentType::TextHtmlBase64);
        assert_eq!(ContentType::parse("Application/Json"), ContentType::ApplicationJson);
    }

    #[test]
    fn test_parse_ignores_surrounding_whitespace() {
        assert_eq!(ContentType::parse("  text/plain \n"), ContentType::TextPlain);
    }

    #[test]
    fn test_unrecognized_keeps_original_spelling() {
        // Arrange / Act
        let ct = ContentType::parse("Weird/Type");

        // Assert: the raw string survives for error messages and logs
        assert_eq!(ct, ContentType::Unrecognized("Weird/Type".to_string()));
        assert!(!ct.is_recognized());
        assert_eq!(ct.to_string(), "Weird/Type");
    }

    #[test]
    fn test_as_mime_is_lower_case_for_known_types() {
        assert_eq!(ContentType::ImageJpegBase64.as_mime(), "image/jpeg;base64");
        assert_eq!(ContentType::ApplicationJson.to_string(), "application/json");
    }

    #[test]
    fn test_system_message_parse() {
        assert_eq!(SystemMessage::parse("onConnect"), Some(SystemMessage::OnConnect));
        assert_eq!(SystemMessage::parse("ONCONNECT"), Some(SystemMessage::OnConnect));
        assert_eq!(
            SystemMessage::parse("onEditCardSettings"),
            Some(SystemMessage::OnEditCardSettings)
        );
        assert_eq!(
            SystemMessage::parse("onDisplayCommandList"),
            Some(SystemMessage::OnDisplayCommandList)
        );
    }

    #[test]
    fn test_ordinary_card_names_are_not_system_messages() {
        assert_eq!(SystemMessage::parse("temperature"), None);
        assert_eq!(SystemMessage::parse(""), None);
    }
}
