//! HTML sanitization boundary.
//!
//! Every string that ends up in the view passes through [`RenderBoundary`],
//! which wraps an [`HtmlSanitizer`] and the configured [`AllowList`].  The
//! default [`AllowListSanitizer`] is a small single-pass tokenizer:
//!
//! - allowed tags are re-emitted with only allowed attributes, each value
//!   re-quoted and escaped;
//! - other tags are dropped, their text content kept;
//! - `script`, `style` and the other executable containers are dropped along
//!   with their content;
//! - comments, doctypes and processing instructions are dropped;
//! - a `<` that does not start a tag is escaped;
//! - `src`/`href` values must be relative or use `http`, `https` or `mailto`;
//!   `src` may additionally be a `data:image/` URI.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::domain::safe_html::SafeHtml;

/// Elements removed together with everything up to their closing tag.
const DROP_WITH_CONTENT: &[&str] = &[
    "script", "style", "iframe", "object", "embed", "noscript", "template",
];

const DEFAULT_TAGS: &[&str] = &[
    "a", "b", "br", "button", "div", "em", "form", "h5", "i", "img", "input", "label", "li",
    "option", "p", "path", "select", "small", "span", "strong", "svg", "textarea", "ul",
];

const DEFAULT_ATTRIBUTES: &[&str] = &[
    "src",
    "alt",
    "title",
    "class",
    "type",
    "id",
    "value",
    "aria-label",
    "width",
    "height",
    "fill",
    "viewBox",
    "d",
    "href",
    "name",
    "for",
    "placeholder",
    "selected",
    "checked",
];

const SAFE_URL_SCHEMES: &[&str] = &["http", "https", "mailto"];

/// Tags and attributes that may appear in rendered output.
///
/// Tag names match case-insensitively.  Attribute names also match
/// case-insensitively but are emitted with the spelling given here, so SVG's
/// `viewBox` survives a lower-cased input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllowList {
    pub tags: BTreeSet<String>,
    pub attributes: BTreeSet<String>,
}

impl Default for AllowList {
    fn default() -> Self {
        Self::new(DEFAULT_TAGS.iter().copied(), DEFAULT_ATTRIBUTES.iter().copied())
    }
}

impl AllowList {
    /// Builds an allow-list from tag and attribute names.
    pub fn new<'a>(
        tags: impl IntoIterator<Item = &'a str>,
        attributes: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        Self {
            tags: tags.into_iter().map(str::to_ascii_lowercase).collect(),
            attributes: attributes.into_iter().map(str::to_string).collect(),
        }
    }

    /// `true` if `tag` may be emitted.
    pub fn allows_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    /// The canonical spelling of `attribute`, if it is allowed.
    pub fn canonical_attribute(&self, attribute: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.eq_ignore_ascii_case(attribute))
            .map(String::as_str)
    }
}

/// Reduces an HTML fragment to what `policy` allows.
#[cfg_attr(test, mockall::automock)]
pub trait HtmlSanitizer {
    fn sanitize(&self, html: &str, policy: &AllowList) -> String;
}

/// Escapes `&`, `<`, `>`, `"` and `'`.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// The single sanitization point of the render pipeline.
pub struct RenderBoundary {
    sanitizer: Box<dyn HtmlSanitizer + Send>,
    policy: AllowList,
}

impl RenderBoundary {
    pub fn new(sanitizer: Box<dyn HtmlSanitizer + Send>, policy: AllowList) -> Self {
        Self { sanitizer, policy }
    }

    /// Sanitizes an HTML fragment.
    pub fn render(&self, html: &str) -> SafeHtml {
        SafeHtml::from_sanitized(self.sanitizer.sanitize(html, &self.policy))
    }

    /// Renders literal text: escaped first, then sanitized.
    pub fn text(&self, text: &str) -> SafeHtml {
        self.render(&escape_html(text))
    }

    pub fn policy(&self) -> &AllowList {
        &self.policy
    }
}

impl std::fmt::Debug for RenderBoundary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderBoundary")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

// ── Allow-list sanitizer ──────────────────────────────────────────────────────

/// Default tokenizing sanitizer.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowListSanitizer;

impl HtmlSanitizer for AllowListSanitizer {
    fn sanitize(&self, html: &str, policy: &AllowList) -> String {
        let mut out = String::with_capacity(html.len());
        let mut rest = html;
        while let Some(lt) = rest.find('<') {
            push_text(&mut out, &rest[..lt]);
            let tail = &rest[lt..];
            let consumed = sanitize_construct(tail, policy, &mut out);
            rest = &tail[consumed..];
        }
        push_text(&mut out, rest);
        out
    }
}

fn push_text(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '>' => out.push_str("&gt;"),
            other => out.push(other),
        }
    }
}

/// Handles the construct starting at the `<` at the front of `tail`.
/// Returns the number of bytes consumed.
fn sanitize_construct(tail: &str, policy: &AllowList, out: &mut String) -> usize {
    if tail.starts_with("<!--") {
        return tail.find("-->").map_or(tail.len(), |end| end + 3);
    }
    if tail.starts_with("<!") || tail.starts_with("<?") {
        return tail.find('>').map_or(tail.len(), |end| end + 1);
    }

    let closing = tail.starts_with("</");
    let name_start = if closing { 2 } else { 1 };
    let name_len = tag_name_len(&tail[name_start..]);
    let Some(tag_end) = (name_len > 0)
        .then(|| find_tag_end(tail, name_start + name_len))
        .flatten()
    else {
        out.push_str("&lt;");
        return 1;
    };

    let name = tail[name_start..name_start + name_len].to_ascii_lowercase();

    if closing {
        if policy.allows_tag(&name) {
            out.push_str("</");
            out.push_str(&name);
            out.push('>');
        }
        return tag_end + 1;
    }

    if DROP_WITH_CONTENT.contains(&name.as_str()) {
        let close = format!("</{name}");
        let after_open = tag_end + 1;
        return match find_ignore_ascii_case(&tail[after_open..], &close) {
            Some(pos) => {
                let close_start = after_open + pos;
                tail[close_start..]
                    .find('>')
                    .map_or(tail.len(), |end| close_start + end + 1)
            }
            None => tail.len(),
        };
    }

    if policy.allows_tag(&name) {
        let body = &tail[name_start + name_len..tag_end];
        out.push('<');
        out.push_str(&name);
        for (attr, value) in parse_attributes(body) {
            let Some(canonical) = policy.canonical_attribute(&attr) else {
                continue;
            };
            let value = value.map(|v| decode_basic_entities(&v));
            if let Some(v) = &value {
                if !url_is_safe(canonical, v) {
                    continue;
                }
            }
            out.push(' ');
            out.push_str(canonical);
            if let Some(v) = value {
                out.push_str("=\"");
                out.push_str(&escape_html(&v));
                out.push('"');
            }
        }
        if body.trim_end().ends_with('/') {
            out.push_str(" /");
        }
        out.push('>');
    }
    tag_end + 1
}

/// Byte offset of the first case-insensitive match of the ASCII `needle`.
/// `needle` starts with `<`, so a match always lands on a char boundary.
fn find_ignore_ascii_case(haystack: &str, needle: &str) -> Option<usize> {
    let needle = needle.as_bytes();
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle))
}

fn tag_name_len(s: &str) -> usize {
    let mut chars = s.char_indices();
    match chars.next() {
        Some((_, c)) if c.is_ascii_alphabetic() => {}
        _ => return 0,
    }
    chars
        .find(|(_, c)| !(c.is_ascii_alphanumeric() || *c == '-'))
        .map_or(s.len(), |(i, _)| i)
}

/// Byte index of the `>` closing the tag, skipping quoted attribute values.
fn find_tag_end(tail: &str, from: usize) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, c) in tail[from..].char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '>') => return Some(from + i),
            (None, '<') => return None,
            _ => {}
        }
    }
    None
}

/// Splits a tag body into `(name, value)` pairs.  Names are returned as
/// written; values are returned without their quotes.
fn parse_attributes(body: &str) -> Vec<(String, Option<String>)> {
    let mut attrs = Vec::new();
    let mut rest = body;
    loop {
        rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == '/');
        if rest.is_empty() {
            break;
        }
        let name_end = rest
            .find(|c: char| c.is_whitespace() || c == '=' || c == '/')
            .unwrap_or(rest.len());
        let name = rest[..name_end].to_string();
        rest = rest[name_end..].trim_start();

        let Some(after_eq) = rest.strip_prefix('=') else {
            attrs.push((name, None));
            continue;
        };
        let after_eq = after_eq.trim_start();
        let (value, remaining) = match after_eq.chars().next() {
            Some(q @ ('"' | '\'')) => {
                let inner = &after_eq[1..];
                match inner.find(q) {
                    Some(end) => (&inner[..end], &inner[end + 1..]),
                    None => (inner, ""),
                }
            }
            _ => {
                let end = after_eq.find(char::is_whitespace).unwrap_or(after_eq.len());
                (&after_eq[..end], &after_eq[end..])
            }
        };
        attrs.push((name, Some(value.to_string())));
        rest = remaining;
    }
    attrs
}

fn decode_basic_entities(value: &str) -> String {
    if !value.contains('&') {
        return value.to_string();
    }
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

fn url_is_safe(attribute: &str, value: &str) -> bool {
    if attribute != "src" && attribute != "href" {
        return true;
    }
    let normalized: String = value
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();
    let scheme_end = normalized.find(':');
    let path_start = normalized.find(['/', '?', '#']);
    let scheme = match (scheme_end, path_start) {
        (Some(colon), Some(path)) if path < colon => return true,
        (Some(colon), _) => &normalized[..colon],
        (None, _) => return true,
    };
    if SAFE_URL_SCHEMES.contains(&scheme) {
        return true;
    }
    attribute == "src" && normalized.starts_with("data:image/")
}

// ── Tests ─────────────────────────────────────────────────────────────────────
