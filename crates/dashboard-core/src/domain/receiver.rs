//! Receiver identity.
//!
//! Every inbound message is routed to a receiver by out-of-band metadata (the
//! `card` header on the data topic).  One receiver id is special: the
//! dashboard root, which stands for the whole-page surface instead of a card.

use std::fmt;

/// Identity of the visual slot a message updates, e.g. `"card1"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReceiverId(String);

impl ReceiverId {
    /// Wraps a receiver id string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReceiverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ReceiverId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ReceiverId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Where a render result lands in the view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderTarget {
    /// The payload slot of one card.
    Card(ReceiverId),
    /// The shared dashboard surface (bootstrap content, settings forms).
    Dashboard,
}

impl fmt::Display for RenderTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Card(id) => write!(f, "card {id}"),
            Self::Dashboard => f.write_str("dashboard"),
        }
    }
}
