//! Session state machine.
//!
//! ```text
//!                 connect()                 open + subscribe + handshake ok
//! Disconnected ─────────────► Connecting ─────────────────────────────────► Connected
//!      ▲                          │ failure                                     │
//!      └──────────────────────────┴─────────── disconnect() / shutdown() ◄──────┘
//!                                               / transport closed
//! ```
//!
//! The session owns the transport and holds at most one data subscription.
//! Every path that creates a subscription releases the previous one first.
//!
//! # Resubscription
//!
//! Saving an entity or leaving a settings form makes the server re-send the
//! start dashboard on a fresh subscription.  [`Session::schedule_resubscribe`]
//! releases the subscription and arms a deadline; when it passes, the event
//! loop calls [`Session::on_reconnect_timer`].  `disconnect()` and
//! `shutdown()` cancel a pending deadline.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::application::transport::{
    InboundFrame, SubscriptionId, Transport, TransportError, TransportEvent,
};
use crate::domain::commands::OutboundCommand;
use crate::domain::config::ClientConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
}

/// What `connect()` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    Established,
    /// Already connected; nothing was sent.
    AlreadyConnected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub data_topic: String,
    pub reconnect_delay: Duration,
}

impl From<&ClientConfig> for SessionConfig {
    fn from(config: &ClientConfig) -> Self {
        Self {
            data_topic: config.data_topic.clone(),
            reconnect_delay: config.reconnect_delay,
        }
    }
}

pub struct Session<T: Transport> {
    transport: T,
    config: SessionConfig,
    state: SessionState,
    subscription: Option<SubscriptionId>,
    reconnect_at: Option<Instant>,
    events: Option<mpsc::Receiver<TransportEvent>>,
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T, config: SessionConfig) -> Self {
        Self {
            transport,
            config,
            state: SessionState::Disconnected,
            subscription: None,
            reconnect_at: None,
            events: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == SessionState::Connected
    }

    /// The active data subscription, if any.
    pub fn subscription(&self) -> Option<&SubscriptionId> {
        self.subscription.as_ref()
    }

    /// When a scheduled resubscription is due.
    pub fn reconnect_deadline(&self) -> Option<Instant> {
        self.reconnect_at
    }

    /// Hands the event channel of the current connection to the caller.
    /// Returns `None` if it was already taken or there is no connection.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<TransportEvent>> {
        self.events.take()
    }

    /// Opens the transport, subscribes to the data topic and sends the
    /// connect handshake.  A no-op while connected.
    ///
    /// # Errors
    ///
    /// Any [`TransportError`]; the session is `Disconnected` afterwards.
    pub async fn connect(&mut self) -> Result<ConnectOutcome, TransportError> {
        if self.state == SessionState::Connected {
            debug!("connect ignored: already connected");
            return Ok(ConnectOutcome::AlreadyConnected);
        }

        self.state = SessionState::Connecting;
        let events = match self.transport.open().await {
            Ok(events) => events,
            Err(e) => {
                warn!("connect failed: {e}");
                self.state = SessionState::Disconnected;
                return Err(e);
            }
        };
        self.events = Some(events);

        if let Err(e) = self.subscribe_and_handshake().await {
            warn!("connect failed after open: {e}");
            self.abandon_connection().await;
            return Err(e);
        }

        self.state = SessionState::Connected;
        info!(topic = %self.config.data_topic, "session connected");
        Ok(ConnectOutcome::Established)
    }

    /// Sends the disconnect notice, unsubscribes and closes.  A no-op unless
    /// connected.
    ///
    /// Every step is attempted even if an earlier one fails; the session is
    /// `Disconnected` afterwards either way and the first error is returned.
    pub async fn disconnect(&mut self) -> Result<(), TransportError> {
        self.reconnect_at = None;
        if self.state != SessionState::Connected {
            debug!("disconnect ignored: not connected");
            return Ok(());
        }

        let notice = self.send_unchecked(&OutboundCommand::disconnect()).await;
        let released = self.release_subscription().await;
        let closed = self.transport.close().await;
        self.reset();
        info!("session disconnected");
        notice.and(released).and(closed)
    }

    /// Sends the shutdown command without waiting for an acknowledgement,
    /// then releases the subscription and closes best-effort.
    ///
    /// # Errors
    ///
    /// [`TransportError::NotConnected`] if there is no connection to send the
    /// command on, or the send error.  Cleanup errors are only logged.
    pub async fn shutdown(&mut self) -> Result<(), TransportError> {
        self.reconnect_at = None;
        if self.state != SessionState::Connected {
            warn!("shutdown requested without a connection");
            return Err(TransportError::NotConnected);
        }

        let sent = self.send_unchecked(&OutboundCommand::shutdown()).await;
        if let Err(e) = self.release_subscription().await {
            debug!("unsubscribe during shutdown: {e}");
        }
        if let Err(e) = self.transport.close().await {
            debug!("close during shutdown: {e}");
        }
        self.reset();
        info!("shutdown sent");
        sent
    }

    /// Sends an outbound command.
    ///
    /// # Errors
    ///
    /// [`TransportError::NotConnected`] unless connected.
    pub async fn send(&mut self, command: &OutboundCommand) -> Result<(), TransportError> {
        if self.state != SessionState::Connected {
            return Err(TransportError::NotConnected);
        }
        self.send_unchecked(command).await
    }

    /// Releases the data subscription and arms the reconnect deadline.
    ///
    /// # Errors
    ///
    /// [`TransportError::NotConnected`] unless connected, or the unsubscribe
    /// error; the connection is closed and the session is `Disconnected`
    /// after an unsubscribe error.
    pub async fn schedule_resubscribe(&mut self) -> Result<(), TransportError> {
        if self.state != SessionState::Connected {
            return Err(TransportError::NotConnected);
        }
        if let Err(e) = self.release_subscription().await {
            warn!("unsubscribe before resubscribe failed: {e}");
            self.abandon_connection().await;
            return Err(e);
        }
        let deadline = Instant::now() + self.config.reconnect_delay;
        self.reconnect_at = Some(deadline);
        debug!(delay = ?self.config.reconnect_delay, "resubscribe scheduled");
        Ok(())
    }

    /// Fires a due resubscription: subscribes again and re-sends the
    /// handshake.  Does nothing if no deadline is armed or the session is no
    /// longer connected.
    ///
    /// # Errors
    ///
    /// The subscribe or handshake error.  A connection without a data
    /// subscription is useless, so it is closed and the session is
    /// `Disconnected`; a later `connect` starts over.
    pub async fn on_reconnect_timer(&mut self) -> Result<(), TransportError> {
        if self.reconnect_at.take().is_none() {
            return Ok(());
        }
        if self.state != SessionState::Connected {
            debug!("resubscribe skipped: not connected");
            return Ok(());
        }
        if let Err(e) = self.subscribe_and_handshake().await {
            warn!("resubscribe failed: {e}");
            self.abandon_connection().await;
            return Err(e);
        }
        Ok(())
    }

    /// `true` if `frame` arrived on the active subscription.
    pub fn accepts(&self, frame: &InboundFrame) -> bool {
        self.state == SessionState::Connected
            && self.subscription.as_ref() == Some(&frame.subscription)
    }

    /// Records that the transport dropped the connection.
    pub fn on_transport_closed(&mut self, reason: &str) {
        if self.state != SessionState::Disconnected {
            warn!("connection lost: {reason}");
        }
        self.reset();
    }

    async fn subscribe_and_handshake(&mut self) -> Result<(), TransportError> {
        self.release_subscription().await?;
        let id = self.transport.subscribe(&self.config.data_topic).await?;
        debug!(subscription = %id, "subscribed");
        self.subscription = Some(id);
        self.send_unchecked(&OutboundCommand::connect()).await
    }

    async fn release_subscription(&mut self) -> Result<(), TransportError> {
        match self.subscription.take() {
            Some(id) => {
                debug!(subscription = %id, "unsubscribing");
                self.transport.unsubscribe(&id).await
            }
            None => Ok(()),
        }
    }

    async fn send_unchecked(&mut self, command: &OutboundCommand) -> Result<(), TransportError> {
        let body = command.body_json()?;
        debug!(destination = command.destination, "send");
        self.transport.send(command.destination, &body).await
    }

    /// Closes best-effort after a failed setup step and resets.
    async fn abandon_connection(&mut self) {
        if let Err(e) = self.transport.close().await {
            debug!("close after failed setup: {e}");
        }
        self.reset();
    }

    fn reset(&mut self) {
        self.state = SessionState::Disconnected;
        self.subscription = None;
        self.reconnect_at = None;
        self.events = None;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
