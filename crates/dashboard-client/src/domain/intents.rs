//! User intents.
//!
//! A [`UiIntent`] is what the projection layer emits when the user clicks a
//! button or submits a form.  The event loop turns each intent into a session
//! operation or a gateway command.

use std::collections::BTreeMap;

use crate::domain::commands::{EntityKind, NavigationTarget};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiIntent {
    Connect,
    Disconnect,
    Shutdown,
    /// Fire the command attached to a card.
    PublishCommand { id: String },
    /// Ask the server for an entity's settings form.
    FetchSettings { kind: EntityKind, id: String },
    /// Submit a settings form.
    SaveEntity {
        kind: EntityKind,
        fields: BTreeMap<String, String>,
    },
    DeleteEntity { kind: EntityKind, id: String },
    Navigate { target: NavigationTarget, id: String },
    /// Leave a settings form without saving.
    ReturnToDashboard,
    /// Clear the error banner.
    DismissBanner,
}

impl UiIntent {
    /// Short name for log lines.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Disconnect => "disconnect",
            Self::Shutdown => "shutdown",
            Self::PublishCommand { .. } => "publish",
            Self::FetchSettings { .. } => "settings",
            Self::SaveEntity { .. } => "save",
            Self::DeleteEntity { .. } => "delete",
            Self::Navigate { .. } => "navigate",
            Self::ReturnToDashboard => "return",
            Self::DismissBanner => "dismiss",
        }
    }
}
