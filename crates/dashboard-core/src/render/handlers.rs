//! The four payload handlers.
//!
//! Each handler receives a [`RenderContext`] for one envelope and writes its
//! result into the view through the context, which routes every write
//! through the [`RenderBoundary`].  Handlers never fail outright: decode
//! problems become a visible error artifact plus a [`RenderOutcome`] that
//! says what went wrong.

use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::content_type::SystemMessage;
use crate::domain::receiver::{ReceiverId, RenderTarget};
use crate::domain::view::{DashboardView, ServerLink};
use crate::protocol::envelope::DecodeError;
use crate::protocol::payload::{decode_markup, decode_structured, StructuredPayload};
use crate::render::config::RenderConfig;
use crate::render::dispatcher::{RenderError, RenderOutcome};
use crate::render::sanitizer::{escape_html, RenderBoundary};

pub(crate) const NO_DASHBOARD_DATA: &str = "Error to show dashboard. No data available.";
pub(crate) const NESTED_TYPE_REQUIRED: &str =
    "Error. Incorrect payload type. Require text/html;base64.";
pub(crate) const INVALID_MARKUP: &str = "Error. Payload is not valid base64 markup.";

/// Everything a handler needs to render one envelope.
pub(crate) struct RenderContext<'a> {
    pub boundary: &'a RenderBoundary,
    pub config: &'a RenderConfig,
    pub view: &'a mut DashboardView,
    pub receiver: &'a ReceiverId,
}

impl RenderContext<'_> {
    pub fn target(&self) -> RenderTarget {
        self.view.target_for(self.receiver)
    }

    /// Replaces the content of `target` with sanitized `html`.
    pub fn write_payload(&mut self, target: &RenderTarget, html: &str) {
        let safe = self.boundary.render(html);
        match target {
            RenderTarget::Card(id) => self.view.card_mut(id).rendered_payload = Some(safe),
            RenderTarget::Dashboard => self.view.surface_mut().content = Some(safe),
        }
    }

    /// Shows `message` inline on a card, or on the banner for the dashboard
    /// root.
    pub fn write_error(&mut self, target: &RenderTarget, message: &str) {
        match target {
            RenderTarget::Card(_) => self.write_payload(target, &error_html(message)),
            RenderTarget::Dashboard => self.write_banner(message),
        }
    }

    /// Shows `message` in place of the dashboard surface content.
    pub fn write_surface_error(&mut self, message: &str) {
        self.write_payload(&RenderTarget::Dashboard, &error_html(message));
    }

    pub fn write_banner(&mut self, message: &str) {
        let safe = self.boundary.render(&error_html(message));
        self.view.set_banner(safe);
    }
}

/// Inline error markup.  `message` is literal text.
pub(crate) fn error_html(message: &str) -> String {
    format!(r#"<div class="text-danger">{}</div>"#, escape_html(message))
}

/// Wraps display data in a paragraph.  `data` is markup: the boundary keeps
/// what the allow-list permits and strips the rest.
fn paragraph(data: &str) -> String {
    format!("<p>{data}</p>")
}

// ── image/jpeg;base64 ─────────────────────────────────────────────────────────

/// Shows the image and points the card's save affordance at it.  The base64
/// data is not validated.
pub(crate) fn render_image(ctx: &mut RenderContext<'_>, data: &str) -> RenderOutcome {
    let target = ctx.target();
    let uri = format!("data:image/jpeg;base64,{}", data.trim());
    let html = format!(
        r#"<img src="{}" class="img-fluid" alt="...">"#,
        escape_html(&uri)
    );
    ctx.write_payload(&target, &html);
    if let RenderTarget::Card(id) = &target {
        let card = ctx.view.card_mut(id);
        card.has_image_save_target = true;
        card.save_target = Some(uri);
    }
    RenderOutcome::Rendered { target }
}

// ── text/plain ────────────────────────────────────────────────────────────────

pub(crate) fn render_plain_text(ctx: &mut RenderContext<'_>, data: &str) -> RenderOutcome {
    let target = ctx.target();
    ctx.write_payload(&target, &paragraph(data));
    RenderOutcome::Rendered { target }
}

// ── text/html;base64 ──────────────────────────────────────────────────────────

pub(crate) fn render_markup(ctx: &mut RenderContext<'_>, data: &str) -> RenderOutcome {
    let target = ctx.target();
    match decode_markup(data) {
        Ok(html) => {
            ctx.write_payload(&target, &html);
            RenderOutcome::Rendered { target }
        }
        Err(err) => {
            ctx.write_error(&target, INVALID_MARKUP);
            RenderOutcome::Failed {
                target,
                error: err.into(),
            }
        }
    }
}

// ── application/json ──────────────────────────────────────────────────────────

/// Structured payloads, in order of precedence:
///
/// 1. not JSON: shown as plain text, soft error;
/// 2. nested `text/html;base64`: decoded onto the dashboard surface;
/// 3. system message without nested markup: error on the surface;
/// 4. otherwise a card update from `name`, `status` and `data`.
///
/// An `onConnect` message also updates the server link indicator.
pub(crate) fn render_structured(ctx: &mut RenderContext<'_>, data: &str) -> RenderOutcome {
    let target = ctx.target();
    let payload = match decode_structured(data) {
        Ok(payload) => payload,
        Err(err) => {
            warn!(receiver = %ctx.receiver, "{err}; showing payload as text");
            ctx.write_payload(&target, &paragraph(data));
            return RenderOutcome::Degraded {
                target,
                error: err.into(),
            };
        }
    };

    let system = payload.name.as_deref().and_then(SystemMessage::parse);
    if system == Some(SystemMessage::OnConnect) {
        update_server_link(ctx, &payload);
    }

    if payload.carries_markup() {
        return render_nested_markup(ctx, &payload);
    }

    if let Some(system) = system {
        warn!(
            receiver = %ctx.receiver,
            ?system,
            "system message without nested markup (type {:?})",
            payload.content_type
        );
        ctx.write_surface_error(NESTED_TYPE_REQUIRED);
        return RenderOutcome::Failed {
            target: RenderTarget::Dashboard,
            error: RenderError::UnrecognizedContentType(payload.content_type.clone()),
        };
    }

    render_card_update(ctx, target, &payload, data)
}

fn update_server_link(ctx: &mut RenderContext<'_>, payload: &StructuredPayload) {
    let link = match payload.status.as_deref() {
        Some(status) if status.trim().eq_ignore_ascii_case("ok") => ServerLink::Up,
        Some(_) => ServerLink::Down,
        None => {
            warn!(receiver = %ctx.receiver, "onConnect reply carries no status");
            return;
        }
    };
    debug!(?link, "server link updated");
    ctx.view.surface_mut().server_link = link;
}

fn render_nested_markup(ctx: &mut RenderContext<'_>, payload: &StructuredPayload) -> RenderOutcome {
    let target = RenderTarget::Dashboard;
    let decoded = match &payload.data {
        None => {
            warn!(receiver = %ctx.receiver, "nested markup has no data");
            ctx.write_surface_error(NO_DASHBOARD_DATA);
            return RenderOutcome::Failed {
                target,
                error: RenderError::MissingExpectedField("data"),
            };
        }
        Some(Value::String(encoded)) => decode_markup(encoded),
        Some(_) => Err(DecodeError::InvalidBase64(
            "nested data is not a string".to_string(),
        )),
    };
    match decoded {
        Ok(html) => {
            ctx.write_payload(&target, &html);
            RenderOutcome::Rendered { target }
        }
        Err(err) => {
            ctx.write_error(&target, INVALID_MARKUP);
            RenderOutcome::Failed {
                target,
                error: err.into(),
            }
        }
    }
}

fn render_card_update(
    ctx: &mut RenderContext<'_>,
    target: RenderTarget,
    payload: &StructuredPayload,
    raw: &str,
) -> RenderOutcome {
    if let RenderTarget::Card(id) = &target {
        let text = payload.name.as_deref().map(|n| ctx.boundary.text(n));
        let status = payload.status.as_deref().map(|s| ctx.boundary.text(s));
        let card = ctx.view.card_mut(id);
        if text.is_some() {
            card.last_text = text;
        }
        if status.is_some() {
            card.last_status = status;
        }
    }

    if let Some(value) = payload.data_text() {
        ctx.write_payload(&target, &paragraph(&value));
        return RenderOutcome::Rendered { target };
    }

    warn!(receiver = %ctx.receiver, "structured payload has no data field");
    ctx.write_payload(&target, &paragraph(raw));
    if ctx.config.surface_soft_errors {
        let message = format!("Card {}: payload has no data field.", ctx.receiver);
        ctx.write_banner(&message);
    }
    RenderOutcome::Degraded {
        target,
        error: RenderError::MissingExpectedField("data"),
    }
}
