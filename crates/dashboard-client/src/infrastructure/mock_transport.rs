//! Recording transport for tests.
//!
//! `MockTransport` performs no I/O.  Every call is appended to a shared log so
//! tests can assert exactly what the session did and in what order, and the
//! event channel returned by `open` can be fed from the test with
//! [`MockTransport::deliver`] and [`MockTransport::drop_connection`].
//!
//! Clones share state, so a test keeps one clone and hands the other to the
//! session.
//!
//! ```ignore
//! let mock = MockTransport::new();
//! let mut session = Session::new(mock.clone(), config);
//! session.connect().await?;
//! assert_eq!(mock.subscribe_count(), 1);
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::application::transport::{
    InboundFrame, SubscriptionId, Transport, TransportError, TransportEvent,
};

/// One recorded transport call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    Open,
    Subscribe(String),
    Unsubscribe(SubscriptionId),
    Send { destination: String, body: String },
    Close,
}

#[derive(Default)]
struct MockState {
    calls: Vec<TransportCall>,
    open: bool,
    next_subscription: u64,
    active: Vec<SubscriptionId>,
    events: Option<mpsc::Sender<TransportEvent>>,
    fail_open: bool,
    fail_subscribe: bool,
    fail_send: bool,
}

#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes the next `open` calls fail with [`TransportError::Connect`].
    pub fn set_fail_open(&self, fail: bool) {
        self.lock().fail_open = fail;
    }

    /// Makes `subscribe` calls fail with [`TransportError::Send`].
    pub fn set_fail_subscribe(&self, fail: bool) {
        self.lock().fail_subscribe = fail;
    }

    /// Makes `send` calls fail with [`TransportError::Send`].
    pub fn set_fail_send(&self, fail: bool) {
        self.lock().fail_send = fail;
    }

    /// Every call so far, oldest first.
    pub fn calls(&self) -> Vec<TransportCall> {
        self.lock().calls.clone()
    }

    pub fn subscribe_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| matches!(c, TransportCall::Subscribe(_)))
            .count()
    }

    /// Subscriptions created and not yet released.
    pub fn active_subscriptions(&self) -> Vec<SubscriptionId> {
        self.lock().active.clone()
    }

    /// Pushes a frame into the event channel as if the broker delivered it.
    /// Returns `false` if no connection is open.
    pub fn deliver(&self, subscription: &SubscriptionId, receiver_id: Option<&str>, body: &str) -> bool {
        let frame = InboundFrame {
            subscription: subscription.clone(),
            receiver_id: receiver_id.map(str::to_string),
            body: body.to_string(),
        };
        match &self.lock().events {
            Some(tx) => tx.try_send(TransportEvent::Frame(frame)).is_ok(),
            None => false,
        }
    }

    /// Simulates the broker dropping the connection.
    pub fn drop_connection(&self, reason: &str) {
        let mut state = self.lock();
        state.open = false;
        state.active.clear();
        if let Some(tx) = state.events.take() {
            let _ = tx.try_send(TransportEvent::Closed {
                reason: reason.to_string(),
            });
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn open(&mut self) -> Result<mpsc::Receiver<TransportEvent>, TransportError> {
        let mut state = self.lock();
        state.calls.push(TransportCall::Open);
        if state.fail_open {
            return Err(TransportError::Connect("mock failure".into()));
        }
        let (tx, rx) = mpsc::channel(64);
        state.open = true;
        state.events = Some(tx);
        Ok(rx)
    }

    async fn subscribe(&mut self, topic: &str) -> Result<SubscriptionId, TransportError> {
        let mut state = self.lock();
        state.calls.push(TransportCall::Subscribe(topic.to_string()));
        if !state.open {
            return Err(TransportError::NotConnected);
        }
        if state.fail_subscribe {
            return Err(TransportError::Send("mock failure".into()));
        }
        let id = SubscriptionId::new(format!("sub-{}", state.next_subscription));
        state.next_subscription += 1;
        state.active.push(id.clone());
        Ok(id)
    }

    async fn unsubscribe(&mut self, id: &SubscriptionId) -> Result<(), TransportError> {
        let mut state = self.lock();
        state.calls.push(TransportCall::Unsubscribe(id.clone()));
        if !state.open {
            return Err(TransportError::NotConnected);
        }
        state.active.retain(|active| active != id);
        Ok(())
    }

    async fn send(&mut self, destination: &str, body: &str) -> Result<(), TransportError> {
        let mut state = self.lock();
        state.calls.push(TransportCall::Send {
            destination: destination.to_string(),
            body: body.to_string(),
        });
        if !state.open {
            return Err(TransportError::NotConnected);
        }
        if state.fail_send {
            return Err(TransportError::Send("mock failure".into()));
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        let mut state = self.lock();
        state.calls.push(TransportCall::Close);
        state.open = false;
        state.active.clear();
        state.events = None;
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use tokio_test::{assert_err, assert_ok, block_on};

    use super::*;

    #[test]
    fn test_calls_before_open_fail_but_are_recorded() {
        let mut mock = MockTransport::new();

        assert_err!(block_on(mock.send("/app/publish", "{}")));

        assert_eq!(mock.calls().len(), 1);
    }

    #[test]
    fn test_deliver_reaches_the_open_channel() {
        // Arrange
        let mut mock = MockTransport::new();
        let mut events = assert_ok!(block_on(mock.open()));
        let sub = assert_ok!(block_on(mock.subscribe("/topic/data")));

        // Act
        let delivered = mock.deliver(&sub, Some("card1"), "{}");

        // Assert
        assert!(delivered);
        match events.try_recv() {
            Ok(TransportEvent::Frame(frame)) => assert_eq!(frame.subscription, sub),
            other => panic!("expected a frame, got {other:?}"),
        }
    }

    #[test]
    fn test_drop_connection_emits_closed_once() {
        let mut mock = MockTransport::new();
        let mut events = assert_ok!(block_on(mock.open()));

        mock.drop_connection("gone");

        assert_eq!(
            events.try_recv().ok(),
            Some(TransportEvent::Closed {
                reason: "gone".to_string()
            })
        );
        assert!(!mock.deliver(&SubscriptionId::new("sub-0"), None, "{}"));
    }

    #[test]
    fn test_unsubscribe_releases_subscription() {
        let mut mock = MockTransport::new();
        let _events = assert_ok!(block_on(mock.open()));
        let sub = assert_ok!(block_on(mock.subscribe("/topic/data")));

        assert_ok!(block_on(mock.unsubscribe(&sub)));

        assert!(mock.active_subscriptions().is_empty());
    }
}
