//! Infrastructure layer for the dashboard client.
//!
//! Everything that touches the outside world lives here:
//!
//! - [`stomp_transport`]: STOMP frames over a tokio-tungstenite WebSocket
//! - [`event_loop`]: the task that owns the session and the view
//! - [`console`]: stdin intents and the log projection used by the binary
//! - [`mock_transport`]: a recording [`Transport`](crate::application::Transport)
//!   for tests
//!
//! Command semantics stay in the application layer; message types stay in
//! the domain layer and in `dashboard-core`.

pub mod console;
pub mod event_loop;
pub mod mock_transport;
pub mod stomp_transport;

pub use console::{parse_intent, spawn_stdin_reader, LogProjection};
pub use event_loop::{EventLoop, Flow, Projection};
pub use stomp_transport::StompTransport;
