//! STOMP 1.2 text framing.
//!
//! The dashboard server speaks STOMP over a WebSocket.  Each WebSocket text
//! message normally carries one frame, but the decoder works on a buffer and
//! reports how many bytes it consumed so several frames (and heart-beat EOLs)
//! can share one message.
//!
//! Wire format:
//! ```text
//! COMMAND EOL
//! (header-name ":" header-value EOL)*
//! EOL
//! body NUL
//! ```
//!
//! Header escaping (`\\`, `\n`, `\c`, `\r`) applies to every frame except
//! `CONNECT` and `CONNECTED`.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Errors raised while encoding or decoding a STOMP frame.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StompError {
    /// The command line is not a STOMP command.
    #[error("unknown STOMP command: {0:?}")]
    UnknownCommand(String),

    /// A header line has no `:` separator.
    #[error("malformed header line: {0:?}")]
    MalformedHeader(String),

    /// A header contains an undefined escape sequence.
    #[error("invalid header escape: {0:?}")]
    InvalidEscape(String),

    /// `content-length` is not a non-negative integer.
    #[error("invalid content-length: {0:?}")]
    InvalidContentLength(String),

    /// The buffer ends before the frame's NUL terminator.
    #[error("frame is not terminated")]
    MissingTerminator,
}

/// STOMP client and server commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StompCommand {
    Connect,
    Stomp,
    Connected,
    Send,
    Subscribe,
    Unsubscribe,
    Disconnect,
    Message,
    Receipt,
    Error,
}

impl StompCommand {
    /// Wire spelling of the command.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "CONNECT",
            Self::Stomp => "STOMP",
            Self::Connected => "CONNECTED",
            Self::Send => "SEND",
            Self::Subscribe => "SUBSCRIBE",
            Self::Unsubscribe => "UNSUBSCRIBE",
            Self::Disconnect => "DISCONNECT",
            Self::Message => "MESSAGE",
            Self::Receipt => "RECEIPT",
            Self::Error => "ERROR",
        }
    }

    fn escapes_headers(self) -> bool {
        !matches!(self, Self::Connect | Self::Connected)
    }
}

impl fmt::Display for StompCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StompCommand {
    type Err = StompError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "CONNECT" => Self::Connect,
            "STOMP" => Self::Stomp,
            "CONNECTED" => Self::Connected,
            "SEND" => Self::Send,
            "SUBSCRIBE" => Self::Subscribe,
            "UNSUBSCRIBE" => Self::Unsubscribe,
            "DISCONNECT" => Self::Disconnect,
            "MESSAGE" => Self::Message,
            "RECEIPT" => Self::Receipt,
            "ERROR" => Self::Error,
            other => return Err(StompError::UnknownCommand(other.to_string())),
        })
    }
}

/// One STOMP frame.  Header order is preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StompFrame {
    pub command: StompCommand,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl StompFrame {
    /// Creates a frame with no headers and an empty body.
    pub fn new(command: StompCommand) -> Self {
        Self {
            command,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    /// Appends a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets the body.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Value of the first header named `name`.  Repeated headers: first wins.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

// ── Encoding ──────────────────────────────────────────────────────────────────

/// Encodes a frame, NUL terminator included.
///
/// `SEND` and `MESSAGE` frames with a body get a `content-length` header
/// unless one is already set.
///
/// # Examples
///
/// ```rust
/// use dashboard_core::protocol::stomp::{decode_frame, encode_frame, StompCommand, StompFrame};
///
/// let frame = StompFrame::new(StompCommand::Subscribe)
///     .with_header("id", "sub-0")
///     .with_header("destination", "/topic/data");
/// let wire = encode_frame(&frame);
/// let (decoded, consumed) = decode_frame(&wire).unwrap().unwrap();
/// assert_eq!(decoded, frame);
/// assert_eq!(consumed, wire.len());
/// ```
pub fn encode_frame(frame: &StompFrame) -> String {
    let escape = frame.command.escapes_headers();
    let mut out = String::with_capacity(64 + frame.body.len());
    out.push_str(frame.command.as_str());
    out.push('\n');
    for (name, value) in &frame.headers {
        push_header_part(&mut out, name, escape);
        out.push(':');
        push_header_part(&mut out, value, escape);
        out.push('\n');
    }
    let needs_length = matches!(frame.command, StompCommand::Send | StompCommand::Message)
        && !frame.body.is_empty()
        && frame.header("content-length").is_none();
    if needs_length {
        out.push_str(&format!("content-length:{}\n", frame.body.len()));
    }
    out.push('\n');
    out.push_str(&frame.body);
    out.push('\0');
    out
}

fn push_header_part(out: &mut String, raw: &str, escape: bool) {
    if !escape {
        out.push_str(raw);
        return;
    }
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ':' => out.push_str("\\c"),
            other => out.push(other),
        }
    }
}

// ── Decoding ──────────────────────────────────────────────────────────────────

/// Decodes one frame from the start of `input`.
///
/// Returns `Ok(None)` if `input` holds only heart-beat EOLs.  Otherwise
/// returns the frame and the number of bytes consumed, leading EOLs and the
/// NUL terminator included.
///
/// # Errors
///
/// [`StompError`] if the frame is malformed or not terminated.
pub fn decode_frame(input: &str) -> Result<Option<(StompFrame, usize)>, StompError> {
    let start = input.len() - input.trim_start_matches(['\n', '\r']).len();
    if start == input.len() {
        return Ok(None);
    }
    let rest = &input[start..];

    let (command_line, mut cursor) = next_line(rest).ok_or(StompError::MissingTerminator)?;
    let command: StompCommand = command_line.parse()?;
    let escape = command.escapes_headers();

    let mut headers = Vec::new();
    loop {
        let (line, next) = next_line(&rest[cursor..]).ok_or(StompError::MissingTerminator)?;
        cursor += next;
        if line.is_empty() {
            break;
        }
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| StompError::MalformedHeader(line.to_string()))?;
        let (name, value) = if escape {
            (unescape(name)?, unescape(value)?)
        } else {
            (name.to_string(), value.to_string())
        };
        headers.push((name, value));
    }

    let content_length = headers
        .iter()
        .find(|(k, _)| k == "content-length")
        .map(|(_, v)| {
            v.trim()
                .parse::<usize>()
                .map_err(|_| StompError::InvalidContentLength(v.clone()))
        })
        .transpose()?;

    let body_region = &rest[cursor..];
    let body_len = match content_length {
        Some(len) => {
            if body_region.len() <= len || body_region.as_bytes()[len] != 0 {
                return Err(StompError::MissingTerminator);
            }
            if !body_region.is_char_boundary(len) {
                return Err(StompError::InvalidContentLength(len.to_string()));
            }
            len
        }
        None => body_region.find('\0').ok_or(StompError::MissingTerminator)?,
    };

    let frame = StompFrame {
        command,
        headers,
        body: body_region[..body_len].to_string(),
    };
    Ok(Some((frame, start + cursor + body_len + 1)))
}

/// Returns the line at the start of `s` without its EOL, and the offset just
/// past the EOL.  `None` if there is no EOL.
fn next_line(s: &str) -> Option<(&str, usize)> {
    let end = s.find('\n')?;
    let line = s[..end].strip_suffix('\r').unwrap_or(&s[..end]);
    Some((line, end + 1))
}

fn unescape(raw: &str) -> Result<String, StompError> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('c') => out.push(':'),
            _ => return Err(StompError::InvalidEscape(raw.to_string())),
        }
    }
    Ok(out)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
