//! Dashboard view model.
//!
//! [`DashboardView`] is the single place the render pipeline writes to.  It
//! holds one [`CardRenderState`] per receiver, the shared
//! [`DashboardSurface`] and the shared [`ErrorBanner`].
//!
//! # Ownership rules
//!
//! - Card state is created lazily on the first message for a receiver, or
//!   pre-registered by the projection layer with [`DashboardView::register_card`].
//! - The core never deletes card state.  Removing a card is a projection
//!   concern ([`DashboardView::remove_card`]).
//! - All visible fields are [`SafeHtml`]; the setters are crate-private so only
//!   the dispatcher and its handlers can change what is shown.

use std::collections::BTreeMap;

use crate::domain::receiver::{ReceiverId, RenderTarget};
use crate::domain::safe_html::SafeHtml;

/// Live render state of one card.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CardRenderState {
    /// `HH:MM:SS` of the last message, or `"undefined"` when it had none.
    pub last_timestamp: Option<String>,
    /// Sanitized `status` of the last structured update.
    pub last_status: Option<SafeHtml>,
    /// Sanitized `name` of the last structured update.
    pub last_text: Option<SafeHtml>,
    /// Sanitized fragment shown in the card's payload slot.
    pub rendered_payload: Option<SafeHtml>,
    /// `true` once an image has been shown and can be exported.
    pub has_image_save_target: bool,
    /// `data:` URI the save/export affordance points at.
    pub save_target: Option<String>,
}

/// Connection status reported by the server in its `onConnect` reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServerLink {
    /// No `onConnect` status seen yet.
    #[default]
    Unknown,
    /// The server reported `status: ok`.
    Up,
    /// The server reported any other status.
    Down,
}

/// The whole-page slot used by the dashboard root receiver and by nested
/// markup (start dashboard, settings forms).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardSurface {
    /// Sanitized markup currently shown on the surface.
    pub content: Option<SafeHtml>,
    /// Timestamp of the last message addressed to the dashboard root.
    pub last_timestamp: Option<String>,
    /// Link status from the last `onConnect` reply.
    pub server_link: ServerLink,
    /// Set once the application was shut down; terminal.
    pub offline: bool,
}

/// Shared, single-slot, last-write-wins error surface.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorBanner {
    message: Option<SafeHtml>,
    revision: u64,
}

impl ErrorBanner {
    /// The message currently shown, if any.
    pub fn message(&self) -> Option<&SafeHtml> {
        self.message.as_ref()
    }

    /// Number of writes so far.  Lets a projection detect a rewrite of an
    /// identical message.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub(crate) fn set(&mut self, message: SafeHtml) {
        self.message = Some(message);
        self.revision += 1;
    }

    /// Clears the banner (e.g. when the user dismisses it).
    pub fn clear(&mut self) {
        self.message = None;
    }
}

/// The complete view model of one dashboard page.
#[derive(Debug, Clone)]
pub struct DashboardView {
    root_id: ReceiverId,
    cards: BTreeMap<ReceiverId, CardRenderState>,
    surface: DashboardSurface,
    banner: ErrorBanner,
}

impl DashboardView {
    /// Creates an empty view whose dashboard root is `root_id`.
    pub fn new(root_id: impl Into<ReceiverId>) -> Self {
        Self {
            root_id: root_id.into(),
            cards: BTreeMap::new(),
            surface: DashboardSurface::default(),
            banner: ErrorBanner::default(),
        }
    }

    /// The receiver id that denotes the dashboard root.
    pub fn root_id(&self) -> &ReceiverId {
        &self.root_id
    }

    /// `true` if `receiver` is the dashboard root.
    pub fn is_root(&self, receiver: &ReceiverId) -> bool {
        *receiver == self.root_id
    }

    /// Resolves where content for `receiver` is rendered.
    pub fn target_for(&self, receiver: &ReceiverId) -> RenderTarget {
        if self.is_root(receiver) {
            RenderTarget::Dashboard
        } else {
            RenderTarget::Card(receiver.clone())
        }
    }

    /// Pre-registers a card so it exists before its first message.
    ///
    /// Registering an existing card leaves its state untouched.
    pub fn register_card(&mut self, receiver: impl Into<ReceiverId>) {
        self.cards.entry(receiver.into()).or_default();
    }

    /// Drops a card's state when the card is removed from configuration.
    pub fn remove_card(&mut self, receiver: &ReceiverId) -> Option<CardRenderState> {
        self.cards.remove(receiver)
    }

    /// Render state of `receiver`, if it has been seen or registered.
    pub fn card(&self, receiver: &ReceiverId) -> Option<&CardRenderState> {
        self.cards.get(receiver)
    }

    /// Iterates over all known cards in receiver-id order.
    pub fn cards(&self) -> impl Iterator<Item = (&ReceiverId, &CardRenderState)> {
        self.cards.iter()
    }

    /// Number of known cards.
    pub fn card_count(&self) -> usize {
        self.cards.len()
    }

    /// The shared dashboard surface.
    pub fn surface(&self) -> &DashboardSurface {
        &self.surface
    }

    /// The shared error banner.
    pub fn banner(&self) -> &ErrorBanner {
        &self.banner
    }

    /// Mutable access to the banner, for dismissing it.
    pub fn banner_mut(&mut self) -> &mut ErrorBanner {
        &mut self.banner
    }

    /// Switches the page to its terminal offline display.
    pub fn set_offline(&mut self) {
        self.surface.offline = true;
    }

    pub(crate) fn card_mut(&mut self, receiver: &ReceiverId) -> &mut CardRenderState {
        self.cards.entry(receiver.clone()).or_default()
    }

    pub(crate) fn surface_mut(&mut self) -> &mut DashboardSurface {
        &mut self.surface
    }

    pub(crate) fn set_banner(&mut self, message: SafeHtml) {
        self.banner.set(message);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
