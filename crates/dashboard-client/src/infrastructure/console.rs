//! Terminal projection.
//!
//! The binary has no browser page to draw on, so the terminal stands in for
//! it: stdin lines become [`UiIntent`]s and every view change is written to
//! the log.
//!
//! # Commands
//!
//! ```text
//! connect | disconnect | shutdown
//! publish  <id>
//! settings <card|command|component> <id>
//! save     <card|command|component> key=value ...
//! delete   <card|command|component> <id>
//! navigate <cards|commands> <id>
//! return | dismiss
//! ```

use std::collections::BTreeMap;

use dashboard_core::{DashboardView, RenderOutcome, RenderTarget};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::application::session::SessionState;
use crate::domain::commands::{EntityKind, NavigationTarget};
use crate::domain::intents::UiIntent;
use crate::infrastructure::event_loop::Projection;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandLineError {
    #[error("unknown command `{0}`")]
    UnknownCommand(String),

    #[error("`{command}` needs {expected}")]
    MissingArgument {
        command: &'static str,
        expected: &'static str,
    },

    #[error("unknown entity kind `{0}` (card, command or component)")]
    UnknownKind(String),

    #[error("unknown dashboard `{0}` (cards or commands)")]
    UnknownDashboard(String),

    #[error("`{0}` is not a key=value field")]
    InvalidField(String),
}

// ── Parsing ───────────────────────────────────────────────────────────────────

/// Parses one input line.  Blank lines yield `Ok(None)`.
pub fn parse_intent(line: &str) -> Result<Option<UiIntent>, CommandLineError> {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Ok(None);
    };

    let intent = match command.to_ascii_lowercase().as_str() {
        "connect" => UiIntent::Connect,
        "disconnect" => UiIntent::Disconnect,
        "shutdown" => UiIntent::Shutdown,
        "return" => UiIntent::ReturnToDashboard,
        "dismiss" => UiIntent::DismissBanner,
        "publish" => UiIntent::PublishCommand {
            id: required(words.next(), "publish", "an id")?,
        },
        "settings" => UiIntent::FetchSettings {
            kind: kind(words.next(), "settings")?,
            id: required(words.next(), "settings", "an id")?,
        },
        "delete" => UiIntent::DeleteEntity {
            kind: kind(words.next(), "delete")?,
            id: required(words.next(), "delete", "an id")?,
        },
        "save" => {
            let kind = kind(words.next(), "save")?;
            let mut fields = BTreeMap::new();
            for pair in words {
                let (key, value) = pair
                    .split_once('=')
                    .ok_or_else(|| CommandLineError::InvalidField(pair.to_string()))?;
                fields.insert(key.to_string(), value.to_string());
            }
            UiIntent::SaveEntity { kind, fields }
        }
        "navigate" => {
            let raw = required(words.next(), "navigate", "a dashboard")?;
            let target = match raw.to_ascii_lowercase().as_str() {
                "cards" => NavigationTarget::CardDashboard,
                "commands" => NavigationTarget::CommandDashboard,
                _ => return Err(CommandLineError::UnknownDashboard(raw)),
            };
            UiIntent::Navigate {
                target,
                id: required(words.next(), "navigate", "an id")?,
            }
        }
        other => return Err(CommandLineError::UnknownCommand(other.to_string())),
    };
    Ok(Some(intent))
}

fn required(
    word: Option<&str>,
    command: &'static str,
    expected: &'static str,
) -> Result<String, CommandLineError> {
    word.map(str::to_string)
        .ok_or(CommandLineError::MissingArgument { command, expected })
}

fn kind(word: Option<&str>, command: &'static str) -> Result<EntityKind, CommandLineError> {
    let raw = required(word, command, "an entity kind")?;
    EntityKind::parse(&raw).ok_or(CommandLineError::UnknownKind(raw))
}

/// Reads stdin line by line and forwards parsed intents until stdin closes
/// or the event loop goes away.
pub fn spawn_stdin_reader(intents: mpsc::Sender<UiIntent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => {
                    debug!("stdin closed");
                    return;
                }
                Err(e) => {
                    warn!("stdin: {e}");
                    return;
                }
            };
            match parse_intent(&line) {
                Ok(Some(intent)) => {
                    if intents.send(intent).await.is_err() {
                        return;
                    }
                }
                Ok(None) => {}
                Err(e) => warn!("{e}"),
            }
        }
    })
}

// ── Projection ────────────────────────────────────────────────────────────────

/// Writes view changes to the log.
#[derive(Debug, Default)]
pub struct LogProjection;

impl Projection for LogProjection {
    fn on_render(&mut self, view: &DashboardView, outcome: &RenderOutcome) {
        match outcome {
            RenderOutcome::Rendered { target } => {
                let stamp = match target {
                    RenderTarget::Card(id) => {
                        view.card(id).and_then(|c| c.last_timestamp.clone())
                    }
                    RenderTarget::Dashboard => view.surface().last_timestamp.clone(),
                };
                info!(%target, at = stamp.as_deref().unwrap_or("-"), "updated");
            }
            RenderOutcome::Degraded { target, error } => warn!(%target, "updated with fallback: {error}"),
            RenderOutcome::Failed { target, error } => warn!(%target, "render failed: {error}"),
            RenderOutcome::Dropped { error } => warn!("frame dropped: {error}"),
        }
    }

    fn on_banner(&mut self, view: &DashboardView) {
        match view.banner().message() {
            Some(message) => warn!(banner = %message, "error banner"),
            None => info!("error banner cleared"),
        }
    }

    fn on_session_state(&mut self, state: SessionState) {
        info!(?state, "session");
    }

    fn on_offline(&mut self, _view: &DashboardView) {
        info!("application shut down; dashboard is offline");
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_line_is_no_intent() {
        assert_eq!(parse_intent("   "), Ok(None));
    }

    #[test]
    fn test_simple_commands() {
        assert_eq!(parse_intent("connect"), Ok(Some(UiIntent::Connect)));
        assert_eq!(parse_intent("DISCONNECT"), Ok(Some(UiIntent::Disconnect)));
        assert_eq!(parse_intent("return"), Ok(Some(UiIntent::ReturnToDashboard)));
        assert_eq!(parse_intent("dismiss"), Ok(Some(UiIntent::DismissBanner)));
    }

    #[test]
    fn test_publish_needs_id() {
        assert_eq!(
            parse_intent("publish card4"),
            Ok(Some(UiIntent::PublishCommand { id: "card4".into() }))
        );
        assert_eq!(
            parse_intent("publish"),
            Err(CommandLineError::MissingArgument {
                command: "publish",
                expected: "an id"
            })
        );
    }

    #[test]
    fn test_settings_and_delete_parse_kind() {
        assert_eq!(
            parse_intent("settings component comp2"),
            Ok(Some(UiIntent::FetchSettings {
                kind: EntityKind::Component,
                id: "comp2".into()
            }))
        );
        assert_eq!(
            parse_intent("delete widget w1"),
            Err(CommandLineError::UnknownKind("widget".into()))
        );
    }

    #[test]
    fn test_save_collects_fields() {
        // Arrange
        let line = "save card name=Lamp status=on";

        // Act
        let intent = parse_intent(line).unwrap().unwrap();

        // Assert
        let mut fields = BTreeMap::new();
        fields.insert("name".to_string(), "Lamp".to_string());
        fields.insert("status".to_string(), "on".to_string());
        assert_eq!(
            intent,
            UiIntent::SaveEntity {
                kind: EntityKind::Card,
                fields
            }
        );
    }

    #[test]
    fn test_save_rejects_bare_word() {
        assert_eq!(
            parse_intent("save card oops"),
            Err(CommandLineError::InvalidField("oops".into()))
        );
    }

    #[test]
    fn test_navigate() {
        assert_eq!(
            parse_intent("navigate commands main"),
            Ok(Some(UiIntent::Navigate {
                target: NavigationTarget::CommandDashboard,
                id: "main".into()
            }))
        );
        assert_eq!(
            parse_intent("navigate lobby main"),
            Err(CommandLineError::UnknownDashboard("lobby".into()))
        );
    }

    #[test]
    fn test_unknown_command() {
        assert_eq!(
            parse_intent("reboot now"),
            Err(CommandLineError::UnknownCommand("reboot".into()))
        );
    }
}
