//! Domain layer for dashboard-client.
//!
//! Pure types with no I/O: the client configuration, the outbound command
//! vocabulary and the user intents that trigger it.
//!
//! # What does NOT belong here?
//!
//! - Any `tokio`, socket or WebSocket types
//! - Reading files or environment variables

pub mod commands;
pub mod config;
pub mod intents;

pub use commands::{EntityKind, NavigationTarget, OutboundBody, OutboundCommand};
pub use config::ClientConfig;
pub use intents::UiIntent;
