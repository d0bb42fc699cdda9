//! Marker type for sanitized HTML.

use std::fmt;

/// An HTML fragment that has passed through the sanitization boundary.
///
/// Only [`crate::render::sanitizer::RenderBoundary`] can construct one, so a
/// `SafeHtml` stored in the view is proof that the allow-list was applied.
/// The projection layer may insert it into a page as-is.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SafeHtml(String);

impl SafeHtml {
    pub(crate) fn from_sanitized(html: String) -> Self {
        Self(html)
    }

    /// Returns the sanitized markup.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the wrapper and returns the sanitized markup.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for SafeHtml {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SafeHtml {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
