//! The transport seam.
//!
//! [`Transport`] is the pub/sub connection the session drives.  The real
//! implementation speaks STOMP over a WebSocket; tests use the recording mock.

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors raised by a transport.  All of them are retryable by connecting
/// again.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("not connected")]
    NotConnected,

    #[error("send failed: {0}")]
    Send(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("could not encode command body: {0}")]
    Encode(String),

    #[error("connection closed: {0}")]
    Closed(String),
}

impl From<serde_json::Error> for TransportError {
    fn from(e: serde_json::Error) -> Self {
        Self::Encode(e.to_string())
    }
}

/// Handle of one topic subscription.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionId(String);

impl SubscriptionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A message delivered on a subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundFrame {
    /// Subscription the broker delivered it on.
    pub subscription: SubscriptionId,
    /// Routing header naming the receiver card, if present.
    pub receiver_id: Option<String>,
    /// Raw envelope JSON.
    pub body: String,
}

/// Events a transport pushes to its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Frame(InboundFrame),
    /// The connection ended without a local `close()`.
    Closed { reason: String },
}

/// A pub/sub connection.
///
/// `open` returns the channel on which [`TransportEvent`]s arrive until the
/// connection ends.  Every other method requires an open connection and
/// returns [`TransportError::NotConnected`] otherwise.
#[async_trait]
pub trait Transport: Send {
    async fn open(&mut self) -> Result<mpsc::Receiver<TransportEvent>, TransportError>;

    async fn subscribe(&mut self, topic: &str) -> Result<SubscriptionId, TransportError>;

    async fn unsubscribe(&mut self, id: &SubscriptionId) -> Result<(), TransportError>;

    /// Fire-and-forget send of a JSON body to `destination`.
    async fn send(&mut self, destination: &str, body: &str) -> Result<(), TransportError>;

    async fn close(&mut self) -> Result<(), TransportError>;
}
