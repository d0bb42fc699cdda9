//! STOMP 1.2 over WebSocket.
//!
//! The production [`Transport`].  One `StompTransport` holds at most one
//! WebSocket connection at a time:
//!
//! 1. `open` connects with `connect_async`, sends `CONNECT` and waits for
//!    `CONNECTED` (bounded by the connect timeout);
//! 2. the read half moves into a spawned reader task that decodes frames
//!    and forwards `MESSAGE`s as [`TransportEvent::Frame`];
//! 3. the write half stays here for `SUBSCRIBE`, `UNSUBSCRIBE` and `SEND`.
//!
//! When the broker closes the socket or sends an `ERROR` frame the reader
//! emits a single [`TransportEvent::Closed`] and exits.  A local `close()`
//! aborts the reader first, so it emits nothing.
//!
//! Heart-beating is disabled (`heart-beat:0,0`); stray EOLs from a broker
//! that sends them anyway are skipped by the frame decoder.

use std::time::Duration;

use async_trait::async_trait;
use dashboard_core::protocol::stomp::{
    decode_frame, encode_frame, StompCommand, StompError, StompFrame,
};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::http::Uri;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::application::transport::{
    InboundFrame, SubscriptionId, Transport, TransportError, TransportEvent,
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, WsMessage>;
type WsSource = SplitStream<WsStream>;

/// Header carrying the receiver card of a `MESSAGE`.
pub const RECEIVER_HEADER: &str = "card";

const EVENT_CHANNEL_CAPACITY: usize = 256;

pub struct StompTransport {
    url: String,
    connect_timeout: Duration,
    sink: Option<WsSink>,
    reader: Option<JoinHandle<()>>,
    next_subscription: u64,
}

impl StompTransport {
    pub fn new(url: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            url: url.into(),
            connect_timeout,
            sink: None,
            reader: None,
            next_subscription: 0,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn write(&mut self, frame: &StompFrame) -> Result<(), TransportError> {
        let sink = self.sink.as_mut().ok_or(TransportError::NotConnected)?;
        sink.send(WsMessage::Text(encode_frame(frame)))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    fn drop_connection(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        self.sink = None;
    }
}

#[async_trait]
impl Transport for StompTransport {
    async fn open(&mut self) -> Result<mpsc::Receiver<TransportEvent>, TransportError> {
        self.drop_connection();

        let url = self.url.clone();
        let host = host_from_url(&url).unwrap_or_else(|| "localhost".to_string());
        let connect = async {
            let (ws, _response) = connect_async(url.as_str())
                .await
                .map_err(|e| TransportError::Connect(format!("{url}: {e}")))?;
            let (mut sink, mut source) = ws.split();
            sink.send(WsMessage::Text(encode_frame(&connect_frame(&host))))
                .await
                .map_err(|e| TransportError::Connect(e.to_string()))?;
            let pending = await_connected(&mut source).await?;
            Ok::<_, TransportError>((sink, source, pending))
        };

        let (sink, source, pending) = timeout(self.connect_timeout, connect)
            .await
            .map_err(|_| {
                TransportError::Connect(format!(
                    "timed out after {:?} connecting to {url}",
                    self.connect_timeout
                ))
            })??;

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        self.reader = Some(tokio::spawn(read_frames(source, pending, tx)));
        self.sink = Some(sink);
        info!(url = %self.url, "STOMP session established");
        Ok(rx)
    }

    async fn subscribe(&mut self, topic: &str) -> Result<SubscriptionId, TransportError> {
        let id = SubscriptionId::new(format!("sub-{}", self.next_subscription));
        let frame = StompFrame::new(StompCommand::Subscribe)
            .with_header("id", id.as_str())
            .with_header("destination", topic)
            .with_header("ack", "auto");
        self.write(&frame).await?;
        self.next_subscription += 1;
        Ok(id)
    }

    async fn unsubscribe(&mut self, id: &SubscriptionId) -> Result<(), TransportError> {
        let frame = StompFrame::new(StompCommand::Unsubscribe).with_header("id", id.as_str());
        self.write(&frame).await
    }

    async fn send(&mut self, destination: &str, body: &str) -> Result<(), TransportError> {
        let frame = StompFrame::new(StompCommand::Send)
            .with_header("destination", destination)
            .with_header("content-type", "application/json")
            .with_body(body);
        self.write(&frame).await
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        let Some(mut sink) = self.sink.take() else {
            return Err(TransportError::NotConnected);
        };
        let disconnect = encode_frame(&StompFrame::new(StompCommand::Disconnect));
        let sent = sink
            .send(WsMessage::Text(disconnect))
            .await
            .map_err(|e| TransportError::Send(e.to_string()));
        if let Err(e) = sink.close().await {
            debug!("websocket close: {e}");
        }
        debug!(url = %self.url, "STOMP session closed");
        sent
    }
}

impl Drop for StompTransport {
    fn drop(&mut self) {
        self.drop_connection();
    }
}

// ── Frame helpers ─────────────────────────────────────────────────────────────

/// Host part of a WebSocket URL, used for the STOMP `host` header.
pub fn host_from_url(url: &str) -> Option<String> {
    let uri: Uri = url.parse().ok()?;
    uri.host()
        .map(|host| host.trim_start_matches('[').trim_end_matches(']').to_string())
}

fn connect_frame(host: &str) -> StompFrame {
    StompFrame::new(StompCommand::Connect)
        .with_header("accept-version", "1.2")
        .with_header("host", host)
        .with_header("heart-beat", "0,0")
}

/// Decodes every complete frame at the front of `buffer` and removes it.
/// An incomplete trailing frame stays in the buffer for the next read.
///
/// # Errors
///
/// A [`StompError`] other than a missing terminator; the buffer is cleared
/// since the stream position is lost.
fn drain_frames(buffer: &mut String) -> Result<Vec<StompFrame>, StompError> {
    let mut frames = Vec::new();
    loop {
        match decode_frame(buffer) {
            Ok(Some((frame, consumed))) => {
                buffer.drain(..consumed);
                frames.push(frame);
            }
            Ok(None) => {
                buffer.clear();
                return Ok(frames);
            }
            Err(StompError::MissingTerminator) => return Ok(frames),
            Err(e) => {
                buffer.clear();
                return Err(e);
            }
        }
    }
}

/// Appends the text of a WebSocket message to `buffer`.  Returns `false` for
/// a close message.
fn append_message(buffer: &mut String, message: WsMessage) -> bool {
    match message {
        WsMessage::Text(text) => buffer.push_str(&text),
        WsMessage::Binary(bytes) => match String::from_utf8(bytes) {
            Ok(text) => buffer.push_str(&text),
            Err(e) => warn!("dropping non-UTF-8 binary message: {e}"),
        },
        WsMessage::Close(_) => return false,
        WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_) => {}
    }
    true
}

/// Maps a broker frame to the event it produces, if any.
fn frame_event(frame: StompFrame) -> Option<TransportEvent> {
    match frame.command {
        StompCommand::Message => {
            let Some(subscription) = frame.header("subscription") else {
                warn!("MESSAGE without subscription header dropped");
                return None;
            };
            Some(TransportEvent::Frame(InboundFrame {
                subscription: SubscriptionId::new(subscription),
                receiver_id: frame.header(RECEIVER_HEADER).map(str::to_string),
                body: frame.body,
            }))
        }
        StompCommand::Error => Some(TransportEvent::Closed {
            reason: error_reason(&frame),
        }),
        other => {
            debug!(command = %other, "ignoring broker frame");
            None
        }
    }
}

fn error_reason(frame: &StompFrame) -> String {
    match frame.header("message") {
        Some(message) => format!("broker error: {message}"),
        None if !frame.body.is_empty() => format!("broker error: {}", frame.body.trim()),
        None => "broker error".to_string(),
    }
}

// ── Handshake and reader task ─────────────────────────────────────────────────

/// Reads until `CONNECTED`.  Returns whatever followed it in the same
/// message so the reader task can pick it up.
async fn await_connected(source: &mut WsSource) -> Result<String, TransportError> {
    let mut buffer = String::new();
    while let Some(message) = source.next().await {
        let message = message.map_err(|e| TransportError::Connect(e.to_string()))?;
        if !append_message(&mut buffer, message) {
            break;
        }
        let frames =
            drain_frames(&mut buffer).map_err(|e| TransportError::Protocol(e.to_string()))?;
        for frame in frames {
            match frame.command {
                StompCommand::Connected => {
                    debug!(version = frame.header("version").unwrap_or("?"), "CONNECTED");
                    return Ok(buffer);
                }
                StompCommand::Error => return Err(TransportError::Connect(error_reason(&frame))),
                other => debug!(command = %other, "frame before CONNECTED ignored"),
            }
        }
    }
    Err(TransportError::Connect(
        "connection closed before CONNECTED".to_string(),
    ))
}

async fn read_frames(mut source: WsSource, mut buffer: String, events: mpsc::Sender<TransportEvent>) {
    let reason = loop {
        let frames = match drain_frames(&mut buffer) {
            Ok(frames) => frames,
            Err(e) => {
                warn!("discarding undecodable STOMP data: {e}");
                Vec::new()
            }
        };
        for frame in frames {
            let Some(event) = frame_event(frame) else { continue };
            let terminal = matches!(event, TransportEvent::Closed { .. });
            if events.send(event).await.is_err() {
                debug!("event receiver dropped; reader exiting");
                return;
            }
            if terminal {
                return;
            }
        }

        match source.next().await {
            Some(Ok(message)) => {
                if !append_message(&mut buffer, message) {
                    break "closed by server".to_string();
                }
            }
            Some(Err(e)) => break e.to_string(),
            None => break "stream ended".to_string(),
        }
    };
    let _ = events.send(TransportEvent::Closed { reason }).await;
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_from_url() {
        assert_eq!(
            host_from_url("ws://127.0.0.1:8028/mq2tClientDashboard/websocket").as_deref(),
            Some("127.0.0.1")
        );
        assert_eq!(host_from_url("wss://dash.example.org/ws").as_deref(), Some("dash.example.org"));
        assert_eq!(host_from_url("ws://[::1]:8028/ws").as_deref(), Some("::1"));
        assert_eq!(host_from_url("not a url"), None);
    }

    #[test]
    fn test_connect_frame_headers() {
        let frame = connect_frame("localhost");
        assert_eq!(frame.command, StompCommand::Connect);
        assert_eq!(frame.header("accept-version"), Some("1.2"));
        assert_eq!(frame.header("host"), Some("localhost"));
        assert_eq!(frame.header("heart-beat"), Some("0,0"));
    }

    #[test]
    fn test_drain_frames_keeps_incomplete_tail() {
        // Arrange: one complete frame followed by half of another
        let first = encode_frame(
            &StompFrame::new(StompCommand::Message)
                .with_header("subscription", "sub-0")
                .with_body("{}"),
        );
        let mut buffer = format!("{first}MESSAGE\nsubscription:sub-0\n");

        // Act
        let frames = drain_frames(&mut buffer).unwrap();

        // Assert
        assert_eq!(frames.len(), 1);
        assert_eq!(buffer, "MESSAGE\nsubscription:sub-0\n");
    }

    #[test]
    fn test_drain_frames_skips_heartbeats() {
        let mut buffer = "\n\r\n".to_string();
        assert!(drain_frames(&mut buffer).unwrap().is_empty());
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_drain_frames_clears_garbage() {
        let mut buffer = "NONSENSE\n\n\0".to_string();
        assert!(drain_frames(&mut buffer).is_err());
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_message_frame_becomes_inbound_frame() {
        let frame = StompFrame::new(StompCommand::Message)
            .with_header("subscription", "sub-3")
            .with_header("destination", "/topic/data")
            .with_header(RECEIVER_HEADER, "card7")
            .with_body(r#"{"id":"card7"}"#);

        let event = frame_event(frame);

        assert_eq!(
            event,
            Some(TransportEvent::Frame(InboundFrame {
                subscription: SubscriptionId::new("sub-3"),
                receiver_id: Some("card7".to_string()),
                body: r#"{"id":"card7"}"#.to_string(),
            }))
        );
    }

    #[test]
    fn test_message_without_subscription_is_dropped() {
        let frame = StompFrame::new(StompCommand::Message).with_body("{}");
        assert_eq!(frame_event(frame), None);
    }

    #[test]
    fn test_error_frame_closes_with_broker_message() {
        let frame = StompFrame::new(StompCommand::Error).with_header("message", "bad destination");
        assert_eq!(
            frame_event(frame),
            Some(TransportEvent::Closed {
                reason: "broker error: bad destination".to_string()
            })
        );
    }

    #[test]
    fn test_receipt_is_ignored() {
        let frame = StompFrame::new(StompCommand::Receipt).with_header("receipt-id", "1");
        assert_eq!(frame_event(frame), None);
    }

    #[tokio::test]
    async fn test_methods_require_open_connection() {
        let mut transport = StompTransport::new("ws://127.0.0.1:1/ws", Duration::from_secs(1));

        assert_eq!(
            transport.send("/app/publish", "{}").await.unwrap_err(),
            TransportError::NotConnected
        );
        assert_eq!(
            transport.subscribe("/topic/data").await.unwrap_err(),
            TransportError::NotConnected
        );
        assert_eq!(transport.close().await.unwrap_err(), TransportError::NotConnected);
    }

    #[tokio::test]
    async fn test_open_fails_when_nothing_listens() {
        let mut transport = StompTransport::new("ws://127.0.0.1:1/ws", Duration::from_secs(2));
        let err = transport.open().await.unwrap_err();
        assert!(matches!(err, TransportError::Connect(_)));
    }
}
