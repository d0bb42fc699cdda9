//! Render pipeline: content dispatch, payload handlers, timestamp formatting
//! and the HTML sanitization boundary.

pub mod config;
pub mod dispatcher;
pub mod handlers;
pub mod sanitizer;
pub mod timestamp;

pub use config::RenderConfig;
pub use dispatcher::{Dispatcher, RenderError, RenderOutcome};
pub use sanitizer::{escape_html, AllowList, AllowListSanitizer, HtmlSanitizer, RenderBoundary};
pub use timestamp::{format_timestamp, TimestampZone, UNDEFINED_TIMESTAMP};
