//! Application layer for dashboard-client.
//!
//! Knows *what* happens when the user connects, saves a card or leaves a
//! settings form, and delegates *how* bytes move to a [`transport::Transport`]
//! implementation from the infrastructure layer.
//!
//! - [`session`]: the connection state machine and the single data
//!   subscription.
//! - [`gateway`]: the outbound command API, borrowing the session.

pub mod gateway;
pub mod session;
pub mod transport;

pub use gateway::CommandGateway;
pub use session::{ConnectOutcome, Session, SessionConfig, SessionState};
pub use transport::{InboundFrame, SubscriptionId, Transport, TransportError, TransportEvent};
