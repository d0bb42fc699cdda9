//! Outbound command gateway.
//!
//! Thin API over [`Session::send`] for the user-facing commands.  The
//! gateway borrows the session for the duration of one command; it holds no
//! state of its own.

use std::collections::BTreeMap;

use tracing::info;

use crate::application::session::Session;
use crate::application::transport::{Transport, TransportError};
use crate::domain::commands::{EntityKind, NavigationTarget, OutboundCommand};

pub struct CommandGateway<'a, T: Transport> {
    session: &'a mut Session<T>,
}

impl<'a, T: Transport> CommandGateway<'a, T> {
    pub fn new(session: &'a mut Session<T>) -> Self {
        Self { session }
    }

    /// Fires the command attached to card or command `id`.
    pub async fn publish_command(&mut self, id: &str) -> Result<(), TransportError> {
        self.session.send(&OutboundCommand::publish(id)).await
    }

    /// Requests the settings form of an entity.  The form arrives later as a
    /// system message on the data topic.
    pub async fn fetch_settings(&mut self, kind: EntityKind, id: &str) -> Result<(), TransportError> {
        self.session
            .send(&OutboundCommand::fetch_settings(kind, id))
            .await
    }

    /// Saves an entity, then schedules a resubscription so the server
    /// re-sends the start dashboard.
    pub async fn save_entity(
        &mut self,
        kind: EntityKind,
        fields: &BTreeMap<String, String>,
    ) -> Result<(), TransportError> {
        let command = OutboundCommand::save(kind, fields)?;
        self.session.send(&command).await?;
        info!(%kind, "entity saved");
        self.session.schedule_resubscribe().await
    }

    pub async fn delete_entity(&mut self, kind: EntityKind, id: &str) -> Result<(), TransportError> {
        self.session.send(&OutboundCommand::delete(kind, id)).await
    }

    pub async fn navigate(&mut self, target: NavigationTarget, id: &str) -> Result<(), TransportError> {
        self.session
            .send(&OutboundCommand::navigate(target, id))
            .await
    }

    /// Leaves a settings form without saving.
    pub async fn return_to_dashboard(&mut self) -> Result<(), TransportError> {
        self.session.schedule_resubscribe().await
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
