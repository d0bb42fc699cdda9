//! Content dispatcher.
//!
//! [`Dispatcher::dispatch`] is the single entry point from a decoded
//! [`Envelope`] to the view.  It formats the timestamp, picks a handler from
//! the content type and reports what happened as a [`RenderOutcome`].  No
//! input can make it panic or return early without a visible result: an
//! absent or unknown content type lands in the error branch, which writes to
//! both the card and the banner.

use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::content_type::ContentType;
use crate::domain::receiver::RenderTarget;
use crate::domain::view::DashboardView;
use crate::protocol::envelope::{decode_envelope, DecodeError, Envelope};
use crate::render::config::RenderConfig;
use crate::render::handlers::{self, error_html, RenderContext};
use crate::render::sanitizer::{AllowListSanitizer, HtmlSanitizer, RenderBoundary};
use crate::render::timestamp::format_timestamp;

/// Why a message could not be rendered as intended.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The envelope's content type is absent or outside the taxonomy.
    #[error("unrecognized content type: {}", .0.as_deref().unwrap_or("<absent>"))]
    UnrecognizedContentType(Option<String>),

    /// A structured payload lacks a field it needs.
    #[error("missing expected field `{0}`")]
    MissingExpectedField(&'static str),
}

/// Result of handling one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    /// Content rendered as declared.
    Rendered { target: RenderTarget },
    /// Something was shown, but not what the payload intended (soft error).
    Degraded {
        target: RenderTarget,
        error: RenderError,
    },
    /// Only an error artifact was shown.
    Failed {
        target: RenderTarget,
        error: RenderError,
    },
    /// The envelope itself was unusable; only the banner was written.
    Dropped { error: DecodeError },
}

impl RenderOutcome {
    /// Where the result landed, if anywhere besides the banner.
    pub fn target(&self) -> Option<&RenderTarget> {
        match self {
            Self::Rendered { target }
            | Self::Degraded { target, .. }
            | Self::Failed { target, .. } => Some(target),
            Self::Dropped { .. } => None,
        }
    }

    pub fn is_rendered(&self) -> bool {
        matches!(self, Self::Rendered { .. })
    }

    /// The render error, for `Degraded` and `Failed`.
    pub fn error(&self) -> Option<&RenderError> {
        match self {
            Self::Degraded { error, .. } | Self::Failed { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Routes envelopes to the payload handlers.
#[derive(Debug)]
pub struct Dispatcher {
    boundary: RenderBoundary,
    config: RenderConfig,
}

impl Dispatcher {
    /// Creates a dispatcher using the built-in [`AllowListSanitizer`].
    pub fn new(config: RenderConfig) -> Self {
        Self::with_sanitizer(config, Box::new(AllowListSanitizer))
    }

    /// Creates a dispatcher with a custom sanitizer.
    pub fn with_sanitizer(config: RenderConfig, sanitizer: Box<dyn HtmlSanitizer + Send>) -> Self {
        let boundary = RenderBoundary::new(sanitizer, config.allow_list.clone());
        Self { boundary, config }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// An empty view rooted at the configured dashboard root id.
    pub fn new_view(&self) -> DashboardView {
        DashboardView::new(self.config.dashboard_root_id.as_str())
    }

    /// Renders one envelope into `view`.
    pub fn dispatch(&self, view: &mut DashboardView, envelope: &Envelope) -> RenderOutcome {
        let receiver = &envelope.receiver_id;
        let stamp = format_timestamp(envelope.timestamp, self.config.timestamp_zone);
        match view.target_for(receiver) {
            RenderTarget::Card(id) => view.card_mut(&id).last_timestamp = Some(stamp),
            RenderTarget::Dashboard => view.surface_mut().last_timestamp = Some(stamp),
        }

        let mut ctx = RenderContext {
            boundary: &self.boundary,
            config: &self.config,
            view,
            receiver,
        };
        let outcome = match &envelope.content_type {
            Some(ContentType::ImageJpegBase64) => handlers::render_image(&mut ctx, &envelope.data),
            Some(ContentType::TextPlain) => handlers::render_plain_text(&mut ctx, &envelope.data),
            Some(ContentType::TextHtmlBase64) => handlers::render_markup(&mut ctx, &envelope.data),
            Some(ContentType::ApplicationJson) => {
                handlers::render_structured(&mut ctx, &envelope.data)
            }
            Some(ContentType::Unrecognized(raw)) => render_unrecognized(&mut ctx, Some(raw)),
            None => render_unrecognized(&mut ctx, None),
        };

        match &outcome {
            RenderOutcome::Rendered { target } => debug!(%receiver, %target, "rendered"),
            RenderOutcome::Degraded { target, error } => {
                warn!(%receiver, %target, "rendered with soft error: {error}")
            }
            RenderOutcome::Failed { target, error } => {
                warn!(%receiver, %target, "render failed: {error}")
            }
            RenderOutcome::Dropped { .. } => {}
        }
        outcome
    }

    /// Decodes a raw frame and dispatches it.  A malformed envelope is
    /// reported on the banner and dropped.
    pub fn process_frame(
        &self,
        view: &mut DashboardView,
        raw: &str,
        receiver_id: Option<&str>,
    ) -> RenderOutcome {
        match decode_envelope(raw, receiver_id) {
            Ok(envelope) => self.dispatch(view, &envelope),
            Err(error) => {
                warn!(receiver = receiver_id.unwrap_or("<none>"), "dropping frame: {error}");
                self.report_error(view, "Error. Received a malformed message.");
                RenderOutcome::Dropped { error }
            }
        }
    }

    /// Puts a literal error message on the banner, e.g. a transport failure.
    pub fn report_error(&self, view: &mut DashboardView, message: &str) {
        let safe = self.boundary.render(&error_html(message));
        view.set_banner(safe);
    }
}

fn render_unrecognized(ctx: &mut RenderContext<'_>, raw: Option<&String>) -> RenderOutcome {
    let target = ctx.target();
    let message = match raw {
        Some(_) => format!("Error. Incorrect payload type for card={}.", ctx.receiver),
        None => "Error: message type is undefined.".to_string(),
    };
    if let RenderTarget::Card(_) = target {
        ctx.write_error(&target, &message);
    }
    ctx.write_banner(&message);
    RenderOutcome::Failed {
        target,
        error: RenderError::UnrecognizedContentType(raw.cloned()),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
