//! The client event loop.
//!
//! One task owns the session, the dispatcher and the view, and multiplexes
//! three sources with `tokio::select!`:
//!
//! - user intents from the projection layer,
//! - transport events from the open connection,
//! - the resubscription deadline armed by the session.
//!
//! Every change to the view is reported to a [`Projection`], which is the
//! only thing that turns view state into something visible.  Since all
//! mutation happens on this one task, rendering needs no locking.

use std::future::pending;

use dashboard_core::{DashboardView, Dispatcher, RenderOutcome};
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::application::gateway::CommandGateway;
use crate::application::session::{ConnectOutcome, Session, SessionState};
use crate::application::transport::{Transport, TransportError, TransportEvent};
use crate::domain::intents::UiIntent;

pub const CONNECT_FAILED: &str = "Error. Could not connect to the dashboard server.";
pub const CONNECTION_LOST: &str = "Error. Connection to the dashboard server was lost.";

/// Receives view changes.
pub trait Projection: Send {
    /// A frame was dispatched.  `outcome` says where it landed.
    fn on_render(&mut self, view: &DashboardView, outcome: &RenderOutcome);

    /// The banner was written or cleared.
    fn on_banner(&mut self, view: &DashboardView);

    fn on_session_state(&mut self, state: SessionState);

    /// The application was shut down.  Terminal.
    fn on_offline(&mut self, view: &DashboardView);
}

/// Whether the loop keeps going after a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

pub struct EventLoop<T: Transport, P: Projection> {
    session: Session<T>,
    dispatcher: Dispatcher,
    view: DashboardView,
    projection: P,
    intents: mpsc::Receiver<UiIntent>,
    events: Option<mpsc::Receiver<TransportEvent>>,
}

impl<T: Transport, P: Projection> EventLoop<T, P> {
    pub fn new(
        session: Session<T>,
        dispatcher: Dispatcher,
        projection: P,
        intents: mpsc::Receiver<UiIntent>,
    ) -> Self {
        let view = dispatcher.new_view();
        Self {
            session,
            dispatcher,
            view,
            projection,
            intents,
            events: None,
        }
    }

    pub fn view(&self) -> &DashboardView {
        &self.view
    }

    pub fn session(&self) -> &Session<T> {
        &self.session
    }

    /// Runs until shutdown or until the intent channel closes.  Returns the
    /// final view.
    pub async fn run(mut self) -> DashboardView {
        info!("event loop started");
        while self.step().await == Flow::Continue {}
        info!("event loop stopped");
        self.view
    }

    /// Waits for the next intent, transport event or due deadline and
    /// handles it.
    pub async fn step(&mut self) -> Flow {
        let deadline = self.session.reconnect_deadline();
        tokio::select! {
            intent = self.intents.recv() => match intent {
                Some(intent) => self.handle_intent(intent).await,
                None => {
                    info!("intent channel closed");
                    if let Err(e) = self.session.disconnect().await {
                        debug!("disconnect on exit: {e}");
                    }
                    Flow::Stop
                }
            },
            event = next_event(&mut self.events) => {
                self.handle_event(event);
                Flow::Continue
            }
            _ = deadline_reached(deadline) => {
                if let Err(e) = self.session.on_reconnect_timer().await {
                    self.report(&e, "resubscribe");
                }
                self.sync_session();
                Flow::Continue
            }
        }
    }

    async fn handle_intent(&mut self, intent: UiIntent) -> Flow {
        debug!(intent = intent.name(), "intent");
        let result = match intent {
            UiIntent::Connect => self.connect().await,
            UiIntent::Disconnect => {
                let result = self.session.disconnect().await;
                self.events = None;
                self.projection.on_session_state(self.session.state());
                result
            }
            UiIntent::Shutdown => {
                let result = self.session.shutdown().await;
                self.events = None;
                if let Err(e) = &result {
                    warn!("shutdown: {e}");
                }
                self.view.set_offline();
                self.projection.on_session_state(self.session.state());
                self.projection.on_offline(&self.view);
                return Flow::Stop;
            }
            UiIntent::PublishCommand { id } => {
                CommandGateway::new(&mut self.session).publish_command(&id).await
            }
            UiIntent::FetchSettings { kind, id } => {
                CommandGateway::new(&mut self.session)
                    .fetch_settings(kind, &id)
                    .await
            }
            UiIntent::SaveEntity { kind, fields } => {
                CommandGateway::new(&mut self.session)
                    .save_entity(kind, &fields)
                    .await
            }
            UiIntent::DeleteEntity { kind, id } => {
                CommandGateway::new(&mut self.session)
                    .delete_entity(kind, &id)
                    .await
            }
            UiIntent::Navigate { target, id } => {
                CommandGateway::new(&mut self.session).navigate(target, &id).await
            }
            UiIntent::ReturnToDashboard => {
                CommandGateway::new(&mut self.session)
                    .return_to_dashboard()
                    .await
            }
            UiIntent::DismissBanner => {
                self.view.banner_mut().clear();
                self.projection.on_banner(&self.view);
                Ok(())
            }
        };
        if let Err(e) = result {
            self.report(&e, "command");
            self.sync_session();
        }
        Flow::Continue
    }

    /// Drops the event channel once the session has torn its connection down.
    fn sync_session(&mut self) {
        if self.events.is_some() && self.session.state() == SessionState::Disconnected {
            self.events = None;
            self.projection.on_session_state(self.session.state());
        }
    }

    async fn connect(&mut self) -> Result<(), TransportError> {
        match self.session.connect().await {
            Ok(ConnectOutcome::Established) => {
                self.events = self.session.take_events();
                self.projection.on_session_state(self.session.state());
                Ok(())
            }
            Ok(ConnectOutcome::AlreadyConnected) => Ok(()),
            Err(e) => {
                warn!("connect: {e}");
                self.dispatcher.report_error(&mut self.view, CONNECT_FAILED);
                self.projection.on_banner(&self.view);
                self.projection.on_session_state(self.session.state());
                Ok(())
            }
        }
    }

    fn handle_event(&mut self, event: Option<TransportEvent>) {
        match event {
            Some(TransportEvent::Frame(frame)) => {
                if !self.session.accepts(&frame) {
                    debug!(subscription = %frame.subscription, "stale frame dropped");
                    return;
                }
                let outcome = self.dispatcher.process_frame(
                    &mut self.view,
                    &frame.body,
                    frame.receiver_id.as_deref(),
                );
                self.projection.on_render(&self.view, &outcome);
            }
            Some(TransportEvent::Closed { reason }) => {
                self.events = None;
                if self.session.state() == SessionState::Disconnected {
                    return;
                }
                self.session.on_transport_closed(&reason);
                self.dispatcher.report_error(&mut self.view, CONNECTION_LOST);
                self.projection.on_banner(&self.view);
                self.projection.on_session_state(self.session.state());
            }
            None => {
                debug!("transport event channel closed");
                self.events = None;
            }
        }
    }

    fn report(&mut self, error: &TransportError, during: &str) {
        warn!("{during} failed: {error}");
        let message = match error {
            TransportError::NotConnected => "Error. Not connected to the dashboard server.".to_string(),
            other => format!("Error. {other}."),
        };
        self.dispatcher.report_error(&mut self.view, &message);
        self.projection.on_banner(&self.view);
    }
}

async fn next_event(events: &mut Option<mpsc::Receiver<TransportEvent>>) -> Option<TransportEvent> {
    match events {
        Some(rx) => rx.recv().await,
        None => pending().await,
    }
}

async fn deadline_reached(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => pending().await,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use dashboard_core::{ReceiverId, RenderConfig, ServerLink};

    use super::*;
    use crate::application::session::SessionConfig;
    use crate::application::transport::SubscriptionId;
    use crate::infrastructure::mock_transport::{MockTransport, TransportCall};

    #[derive(Clone, Default)]
    struct Recorder {
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Recorder {
        fn entries(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }
    }

    impl Projection for Recorder {
        fn on_render(&mut self, _view: &DashboardView, outcome: &RenderOutcome) {
            let entry = match outcome.target() {
                Some(target) => format!("render {target}"),
                None => "render dropped".to_string(),
            };
            self.log.lock().unwrap().push(entry);
        }

        fn on_banner(&mut self, _view: &DashboardView) {
            self.log.lock().unwrap().push("banner".to_string());
        }

        fn on_session_state(&mut self, state: SessionState) {
            self.log.lock().unwrap().push(format!("state {state:?}"));
        }

        fn on_offline(&mut self, _view: &DashboardView) {
            self.log.lock().unwrap().push("offline".to_string());
        }
    }

    struct Harness {
        event_loop: EventLoop<MockTransport, Recorder>,
        intents: mpsc::Sender<UiIntent>,
        mock: MockTransport,
        recorder: Recorder,
    }

    fn harness() -> Harness {
        let mock = MockTransport::new();
        let session = Session::new(
            mock.clone(),
            SessionConfig {
                data_topic: "/topic/data".to_string(),
                reconnect_delay: Duration::from_millis(300),
            },
        );
        let recorder = Recorder::default();
        let (tx, rx) = mpsc::channel(8);
        let event_loop = EventLoop::new(
            session,
            Dispatcher::new(RenderConfig::default()),
            recorder.clone(),
            rx,
        );
        Harness {
            event_loop,
            intents: tx,
            mock,
            recorder,
        }
    }

    impl Harness {
        async fn intent(&mut self, intent: UiIntent) -> Flow {
            self.intents.send(intent).await.unwrap();
            self.event_loop.step().await
        }

        fn active(&self) -> SubscriptionId {
            self.event_loop.session().subscription().cloned().unwrap()
        }
    }

    const CARD_TEXT: &str = r#"{"contentType":"text/plain","data":"21.5","timestamp":0}"#;

    #[tokio::test]
    async fn test_connect_then_frame_renders_card() {
        // Arrange
        let mut h = harness();
        h.intent(UiIntent::Connect).await;
        let sub = h.active();

        // Act
        assert!(h.mock.deliver(&sub, Some("card1"), CARD_TEXT));
        let flow = h.event_loop.step().await;

        // Assert
        assert_eq!(flow, Flow::Continue);
        let card = h.event_loop.view().card(&ReceiverId::new("card1")).unwrap();
        assert_eq!(card.rendered_payload.as_ref().unwrap().as_str(), "<p>21.5</p>");
        assert_eq!(
            h.recorder.entries(),
            vec!["state Connected".to_string(), "render card card1".to_string()]
        );
    }

    #[tokio::test]
    async fn test_frame_on_released_subscription_is_ignored() {
        let mut h = harness();
        h.intent(UiIntent::Connect).await;
        let old = h.active();
        h.intent(UiIntent::ReturnToDashboard).await;

        assert!(h.mock.deliver(&old, Some("card1"), CARD_TEXT));
        h.event_loop.step().await;

        assert!(h.event_loop.view().card(&ReceiverId::new("card1")).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_resubscribes() {
        // Arrange
        let mut h = harness();
        h.intent(UiIntent::Connect).await;
        h.intent(UiIntent::ReturnToDashboard).await;
        assert!(h.event_loop.session().subscription().is_none());

        // Act: nothing else is pending, so the paused clock jumps to the deadline
        h.event_loop.step().await;

        // Assert
        assert_eq!(h.mock.subscribe_count(), 2);
        assert_eq!(h.mock.active_subscriptions().len(), 1);
        let connects = h
            .mock
            .calls()
            .into_iter()
            .filter(|c| matches!(c, TransportCall::Send { destination, .. } if destination == "/app/connect"))
            .count();
        assert_eq!(connects, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_resubscribe_disconnects_so_connect_works_again() {
        // Arrange
        let mut h = harness();
        h.intent(UiIntent::Connect).await;
        h.intent(UiIntent::ReturnToDashboard).await;
        h.mock.set_fail_subscribe(true);

        // Act
        h.event_loop.step().await;

        // Assert
        assert_eq!(h.event_loop.session().state(), SessionState::Disconnected);
        assert!(h.event_loop.view().banner().message().is_some());
        assert_eq!(
            h.recorder.entries().last().map(String::as_str),
            Some("state Disconnected")
        );

        h.mock.set_fail_subscribe(false);
        h.intent(UiIntent::Connect).await;
        assert_eq!(h.event_loop.session().state(), SessionState::Connected);
        assert_eq!(h.mock.active_subscriptions().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_connect_shows_banner() {
        let mut h = harness();
        h.mock.set_fail_open(true);

        h.intent(UiIntent::Connect).await;

        let banner = h.event_loop.view().banner().message().unwrap();
        assert!(banner.as_str().contains(CONNECT_FAILED));
        assert_eq!(h.event_loop.session().state(), SessionState::Disconnected);
    }

    #[tokio::test]
    async fn test_command_while_disconnected_shows_banner() {
        let mut h = harness();

        let flow = h.intent(UiIntent::PublishCommand { id: "card1".into() }).await;

        assert_eq!(flow, Flow::Continue);
        assert!(h.event_loop.view().banner().message().is_some());
        assert!(h.mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_lost_connection_resets_session() {
        let mut h = harness();
        h.intent(UiIntent::Connect).await;

        h.mock.drop_connection("broker restarted");
        h.event_loop.step().await;

        assert_eq!(h.event_loop.session().state(), SessionState::Disconnected);
        let banner = h.event_loop.view().banner().message().unwrap();
        assert!(banner.as_str().contains(CONNECTION_LOST));
    }

    #[tokio::test]
    async fn test_shutdown_goes_offline_and_stops() {
        // Arrange
        let mut h = harness();
        h.intent(UiIntent::Connect).await;

        // Act
        let flow = h.intent(UiIntent::Shutdown).await;

        // Assert
        assert_eq!(flow, Flow::Stop);
        assert!(h.event_loop.view().surface().offline);
        assert_eq!(h.recorder.entries().last().map(String::as_str), Some("offline"));
        assert_eq!(h.mock.calls().last(), Some(&TransportCall::Close));
    }

    #[tokio::test]
    async fn test_shutdown_without_connection_still_goes_offline() {
        let mut h = harness();

        let flow = h.intent(UiIntent::Shutdown).await;

        assert_eq!(flow, Flow::Stop);
        assert!(h.event_loop.view().surface().offline);
    }

    #[tokio::test]
    async fn test_dismiss_banner_clears_it() {
        let mut h = harness();
        h.intent(UiIntent::Disconnect).await;
        h.intent(UiIntent::PublishCommand { id: "x".into() }).await;
        assert!(h.event_loop.view().banner().message().is_some());

        h.intent(UiIntent::DismissBanner).await;

        assert!(h.event_loop.view().banner().message().is_none());
    }

    #[tokio::test]
    async fn test_on_connect_reply_updates_server_link() {
        let mut h = harness();
        h.intent(UiIntent::Connect).await;
        let sub = h.active();
        let reply = r#"{"contentType":"application/json","data":"{\"name\":\"onConnect\",\"status\":\"ok\"}"}"#;

        h.mock.deliver(&sub, Some("dashboard"), reply);
        h.event_loop.step().await;

        assert_eq!(h.event_loop.view().surface().server_link, ServerLink::Up);
    }

    #[tokio::test]
    async fn test_run_stops_when_intents_close() {
        let h = harness();
        drop(h.intents);

        let view = h.event_loop.run().await;

        assert!(!view.surface().offline);
    }
}
