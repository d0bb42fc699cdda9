//! Outbound command vocabulary.
//!
//! Every user action becomes one fire-and-forget STOMP `SEND` to an `/app/...`
//! destination with a JSON body of one of two shapes:
//!
//! ```text
//! {"id": "<card, command or component id>"}
//! {"data": "<entity fields as a JSON string>"}
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// Server destinations.
pub mod destinations {
    pub const CONNECT: &str = "/app/connect";
    pub const DISCONNECT: &str = "/app/disconnect";
    pub const SHUTDOWN: &str = "/app/shutdownApp";
    pub const PUBLISH: &str = "/app/publish";

    pub const EDIT_CARD_SETTINGS: &str = "/app/editCardSettings";
    pub const EDIT_COMMAND_SETTINGS: &str = "/app/editCommandSettings";
    pub const EDIT_COMPONENT_SETTINGS: &str = "/app/editComponentSettings";

    pub const SAVE_CARD: &str = "/app/saveCard";
    pub const SAVE_COMMAND: &str = "/app/saveCommand";
    pub const SAVE_COMPONENT: &str = "/app/saveComponent";

    pub const DELETE_CARD: &str = "/app/deleteCard";
    pub const DELETE_COMMAND: &str = "/app/deleteCommand";
    pub const DELETE_COMPONENT: &str = "/app/deleteComponent";

    pub const DISPLAY_CARD_DASHBOARD: &str = "/app/displayCardDashboard";
    pub const DISPLAY_COMMAND_DASHBOARD: &str = "/app/displayCommandDashboard";
}

/// Fixed ids of the session-level commands.
pub const CONNECT_ID: &str = "doConnect";
pub const DISCONNECT_ID: &str = "disconnect";
pub const SHUTDOWN_ID: &str = "shutdown";

/// The configurable entities the server manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Card,
    Command,
    Component,
}

impl EntityKind {
    pub fn settings_destination(self) -> &'static str {
        match self {
            Self::Card => destinations::EDIT_CARD_SETTINGS,
            Self::Command => destinations::EDIT_COMMAND_SETTINGS,
            Self::Component => destinations::EDIT_COMPONENT_SETTINGS,
        }
    }

    pub fn save_destination(self) -> &'static str {
        match self {
            Self::Card => destinations::SAVE_CARD,
            Self::Command => destinations::SAVE_COMMAND,
            Self::Component => destinations::SAVE_COMPONENT,
        }
    }

    pub fn delete_destination(self) -> &'static str {
        match self {
            Self::Card => destinations::DELETE_CARD,
            Self::Command => destinations::DELETE_COMMAND,
            Self::Component => destinations::DELETE_COMPONENT,
        }
    }

    /// Parses `card`, `command` or `component` (case-insensitive).
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "card" => Some(Self::Card),
            "command" => Some(Self::Command),
            "component" => Some(Self::Component),
            _ => None,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Card => "card",
            Self::Command => "command",
            Self::Component => "component",
        })
    }
}

/// Dashboards the user can navigate to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationTarget {
    CardDashboard,
    CommandDashboard,
}

impl NavigationTarget {
    pub fn destination(self) -> &'static str {
        match self {
            Self::CardDashboard => destinations::DISPLAY_CARD_DASHBOARD,
            Self::CommandDashboard => destinations::DISPLAY_COMMAND_DASHBOARD,
        }
    }
}

/// JSON body of an outbound command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OutboundBody {
    Id { id: String },
    Data { data: String },
}

/// One outbound `SEND`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundCommand {
    pub destination: &'static str,
    pub body: OutboundBody,
}

impl OutboundCommand {
    fn with_id(destination: &'static str, id: impl Into<String>) -> Self {
        Self {
            destination,
            body: OutboundBody::Id { id: id.into() },
        }
    }

    /// Handshake that asks the server for the start dashboard.
    pub fn connect() -> Self {
        Self::with_id(destinations::CONNECT, CONNECT_ID)
    }

    pub fn disconnect() -> Self {
        Self::with_id(destinations::DISCONNECT, DISCONNECT_ID)
    }

    pub fn shutdown() -> Self {
        Self::with_id(destinations::SHUTDOWN, SHUTDOWN_ID)
    }

    /// Fires the command attached to a card.
    pub fn publish(id: impl Into<String>) -> Self {
        Self::with_id(destinations::PUBLISH, id)
    }

    pub fn fetch_settings(kind: EntityKind, id: impl Into<String>) -> Self {
        Self::with_id(kind.settings_destination(), id)
    }

    pub fn delete(kind: EntityKind, id: impl Into<String>) -> Self {
        Self::with_id(kind.delete_destination(), id)
    }

    pub fn navigate(target: NavigationTarget, id: impl Into<String>) -> Self {
        Self::with_id(target.destination(), id)
    }

    /// Saves an entity.  The form fields are serialized into a JSON string
    /// carried in `data`.
    pub fn save(kind: EntityKind, fields: &BTreeMap<String, String>) -> Result<Self, serde_json::Error> {
        Ok(Self {
            destination: kind.save_destination(),
            body: OutboundBody::Data {
                data: serde_json::to_string(fields)?,
            },
        })
    }

    /// The body as sent on the wire.
    pub fn body_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.body)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_commands_match_server_contract() {
        assert_eq!(OutboundCommand::connect().destination, "/app/connect");
        assert_eq!(OutboundCommand::connect().body_json().unwrap(), r#"{"id":"doConnect"}"#);
        assert_eq!(OutboundCommand::disconnect().body_json().unwrap(), r#"{"id":"disconnect"}"#);
        assert_eq!(OutboundCommand::shutdown().destination, "/app/shutdownApp");
        assert_eq!(OutboundCommand::shutdown().body_json().unwrap(), r#"{"id":"shutdown"}"#);
    }

    #[test]
    fn test_entity_destinations() {
        assert_eq!(EntityKind::Card.settings_destination(), "/app/editCardSettings");
        assert_eq!(EntityKind::Command.save_destination(), "/app/saveCommand");
        assert_eq!(EntityKind::Component.delete_destination(), "/app/deleteComponent");
        assert_eq!(NavigationTarget::CommandDashboard.destination(), "/app/displayCommandDashboard");
    }

    #[test]
    fn test_save_body_carries_fields_as_json_string() {
        // Arrange
        let mut fields = BTreeMap::new();
        fields.insert("id".to_string(), "card1".to_string());
        fields.insert("name".to_string(), "Lamp".to_string());

        // Act
        let cmd = OutboundCommand::save(EntityKind::Card, &fields).unwrap();

        // Assert
        assert_eq!(cmd.destination, "/app/saveCard");
        assert_eq!(
            cmd.body_json().unwrap(),
            r#"{"data":"{\"id\":\"card1\",\"name\":\"Lamp\"}"}"#
        );
    }

    #[test]
    fn test_publish_escapes_id() {
        let cmd = OutboundCommand::publish("a\"b");
        assert_eq!(cmd.body_json().unwrap(), r#"{"id":"a\"b"}"#);
    }

    #[test]
    fn test_entity_kind_parse() {
        assert_eq!(EntityKind::parse("Card"), Some(EntityKind::Card));
        assert_eq!(EntityKind::parse(" component "), Some(EntityKind::Component));
        assert_eq!(EntityKind::parse("widget"), None);
    }
}
