//! HomeMq2t live dashboard client entry point.
//!
//! Connects to the dashboard server's STOMP endpoint, subscribes to the card
//! data topic and keeps a live view of every card.  The terminal stands in
//! for the browser page: commands are read from stdin (see
//! `infrastructure::console`) and view changes are written to the log.
//!
//! # Usage
//!
//! ```text
//! dashboard-client [OPTIONS]
//!
//! Options:
//!   --config <FILE>              TOML config file
//!   --server-url <URL>           STOMP WebSocket endpoint
//!   --data-topic <TOPIC>         Card data topic
//!   --reconnect-delay-ms <MS>    Resubscribe delay after save/return
//!   --dashboard-root <ID>        Receiver id of the dashboard root
//!   --log-level <FILTER>         Fallback log filter when RUST_LOG is unset
//!   --autoconnect                Connect on startup
//! ```
//!
//! # Configuration precedence
//!
//! CLI argument > `DASH_*` environment variable > config file > built-in
//! default.
//!
//! | Variable                  | Default                                             |
//! |---------------------------|-----------------------------------------------------|
//! | `DASH_CONFIG`             | none                                                |
//! | `DASH_SERVER_URL`         | `ws://127.0.0.1:8028/mq2tClientDashboard/websocket` |
//! | `DASH_DATA_TOPIC`         | `/topic/data`                                       |
//! | `DASH_RECONNECT_DELAY_MS` | `300`                                               |
//! | `DASH_DASHBOARD_ROOT`     | `dashboard`                                         |
//! | `DASH_LOG_LEVEL`          | `info`                                              |
//! | `DASH_AUTOCONNECT`        | `false`                                             |

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use dashboard_client::application::{Session, SessionConfig};
use dashboard_client::domain::{ClientConfig, UiIntent};
use dashboard_client::infrastructure::{spawn_stdin_reader, EventLoop, LogProjection, StompTransport};
use dashboard_core::Dispatcher;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// HomeMq2t live dashboard client.
#[derive(Debug, Parser)]
#[command(
    name = "dashboard-client",
    about = "Live dashboard client for the HomeMq2t STOMP dashboard server",
    version
)]
struct Cli {
    /// TOML file with a full or partial `ClientConfig`.
    #[arg(long, env = "DASH_CONFIG")]
    config: Option<PathBuf>,

    /// WebSocket URL of the STOMP endpoint.
    #[arg(long, env = "DASH_SERVER_URL")]
    server_url: Option<String>,

    /// Topic carrying card updates.
    #[arg(long, env = "DASH_DATA_TOPIC")]
    data_topic: Option<String>,

    /// Delay in milliseconds before re-subscribing after a save or a return
    /// to the dashboard.
    #[arg(long, env = "DASH_RECONNECT_DELAY_MS")]
    reconnect_delay_ms: Option<u64>,

    /// Receiver id that addresses the dashboard root instead of a card.
    #[arg(long, env = "DASH_DASHBOARD_ROOT")]
    dashboard_root: Option<String>,

    /// Log filter used when `RUST_LOG` is not set.
    #[arg(long, env = "DASH_LOG_LEVEL")]
    log_level: Option<String>,

    /// Connect immediately instead of waiting for a `connect` command.
    #[arg(long, env = "DASH_AUTOCONNECT")]
    autoconnect: bool,
}

impl Cli {
    /// Builds the effective [`ClientConfig`]: the config file (if any), then
    /// every argument that was given.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or is not valid
    /// TOML for a `ClientConfig`.
    fn into_client_config(self) -> anyhow::Result<ClientConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("cannot read config file {}", path.display()))?;
                ClientConfig::from_toml_str(&text)
                    .with_context(|| format!("invalid config file {}", path.display()))?
            }
            None => ClientConfig::default(),
        };

        if let Some(url) = self.server_url {
            config.server_url = url;
        }
        if let Some(topic) = self.data_topic {
            config.data_topic = topic;
        }
        if let Some(ms) = self.reconnect_delay_ms {
            config.reconnect_delay = Duration::from_millis(ms);
        }
        if let Some(root) = self.dashboard_root {
            config.render.dashboard_root_id = root;
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
        if self.autoconnect {
            config.autoconnect = true;
        }
        Ok(config)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// Program entry point.
///
/// The event loop owns all client state on one task, so a current-thread
/// runtime is enough; the stdin reader and the WebSocket reader are spawned
/// onto it.
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let config = Cli::parse().into_client_config()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str())),
        )
        .init();

    info!(
        "dashboard client starting: server={}, topic={}",
        config.server_url, config.data_topic
    );

    let transport = StompTransport::new(config.server_url.clone(), config.connect_timeout);
    let session = Session::new(transport, SessionConfig::from(&config));
    let dispatcher = Dispatcher::new(config.render.clone());

    let (intent_tx, intent_rx) = mpsc::channel(32);
    if config.autoconnect {
        intent_tx
            .send(UiIntent::Connect)
            .await
            .context("event loop is not accepting intents")?;
    }

    // stdin EOF closes the intent channel, which disconnects and stops the loop.
    let reader = spawn_stdin_reader(intent_tx);
    let event_loop = EventLoop::new(session, dispatcher, LogProjection, intent_rx);

    tokio::select! {
        view = event_loop.run() => {
            info!(cards = view.card_count(), offline = view.surface().offline, "dashboard client stopped");
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for Ctrl+C")?;
            info!("received Ctrl+C; exiting");
        }
    }
    reader.abort();
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
