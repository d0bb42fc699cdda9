//! # dashboard-core
//!
//! Shared library for the HomeMq2t live dashboard client.  It turns the raw
//! frames delivered on the dashboard data topic into sanitized, per-card
//! render state.
//!
//! This crate has zero dependencies on sockets, async runtimes, or UI
//! frameworks.  Everything here is synchronous and bounded in cost, so one
//! inbound message is always decoded, dispatched and rendered to completion
//! before the next one is looked at.
//!
//! # Architecture overview
//!
//! ```text
//! raw frame + receiver id
//!         │
//!   protocol::envelope   decode_envelope()  → Envelope
//!         │
//!   render::dispatcher   Dispatcher::dispatch()
//!         │                 ├── image handler
//!         │                 ├── plain-text handler
//!         │                 ├── markup handler (base64 HTML)
//!         │                 └── structured handler (JSON)
//!         │
//!   render::sanitizer    every visible write goes through RenderBoundary
//!         │
//!   domain::view         DashboardView { cards, surface, banner }
//! ```
//!
//! - **`protocol`** – How bytes arrive.  The envelope decoder validates the
//!   outer JSON frame; the STOMP codec frames the pub/sub traffic that carries
//!   those envelopes.
//!
//! - **`domain`** – Pure view-model types: content types, receiver identity,
//!   the per-card render state, the error banner and the dashboard surface.
//!
//! - **`render`** – The dispatcher, the four payload handlers, timestamp
//!   formatting and the HTML sanitization boundary.

pub mod domain;
pub mod protocol;
pub mod render;

// Re-export the most-used types at the crate root so callers can write
// `dashboard_core::Dispatcher` instead of `dashboard_core::render::dispatcher::Dispatcher`.
pub use domain::content_type::{ContentType, SystemMessage};
pub use domain::receiver::{ReceiverId, RenderTarget};
pub use domain::safe_html::SafeHtml;
pub use domain::view::{CardRenderState, DashboardSurface, DashboardView, ErrorBanner, ServerLink};
pub use protocol::envelope::{decode_envelope, DecodeError, Envelope};
pub use render::config::RenderConfig;
pub use render::dispatcher::{Dispatcher, RenderError, RenderOutcome};
pub use render::sanitizer::{AllowList, AllowListSanitizer, HtmlSanitizer};
