//! Domain layer for dashboard-core.
//!
//! The domain layer holds the view-model the render pipeline writes into and
//! the small value types it is keyed by.  Nothing here performs I/O or knows
//! how a card is drawn; turning [`view::DashboardView`] into pixels is the
//! projection layer's job.
//!
//! # What belongs in the domain layer?
//!
//! - The content-type taxonomy and system message names
//! - Receiver identity and render targets
//! - Per-card render state, the shared error banner and the dashboard surface
//! - The [`safe_html::SafeHtml`] marker type for sanitized fragments

pub mod content_type;
pub mod receiver;
pub mod safe_html;
pub mod view;

pub use content_type::{ContentType, SystemMessage};
pub use receiver::{ReceiverId, RenderTarget};
pub use safe_html::SafeHtml;
pub use view::{CardRenderState, DashboardSurface, DashboardView, ErrorBanner, ServerLink};
