//! dashboard-client library crate.
//!
//! Connects to a HomeMq2t dashboard server over STOMP/WebSocket, keeps one
//! data subscription alive and feeds every inbound frame through the
//! `dashboard-core` dispatcher into a live [`dashboard_core::DashboardView`].
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! dashboard server (STOMP over WebSocket)
//!         ↕
//! [dashboard-client]
//!   ├── domain/           ClientConfig, outbound commands, user intents
//!   ├── application/      Session state machine, command gateway, Transport trait
//!   └── infrastructure/
//!         ├── stomp_transport/  tokio-tungstenite + dashboard-core STOMP codec
//!         ├── event_loop/       select! over intents, frames and the resubscribe timer
//!         └── console/          stdin intents and the log projection
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O and no async.
//! - `application` depends on `domain` and talks to the network only through
//!   [`application::Transport`].
//! - `infrastructure` depends on all other layers plus `tokio` and
//!   `tokio-tungstenite`.

/// Domain layer: configuration and command vocabulary (no I/O).
pub mod domain;

/// Application layer: session lifecycle and outbound commands.
pub mod application;

/// Infrastructure layer: WebSocket transport, event loop, terminal I/O.
pub mod infrastructure;
