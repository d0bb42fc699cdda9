//! Client configuration.
//!
//! [`ClientConfig`] holds every runtime setting.  `main.rs` builds it from an
//! optional TOML file, then applies CLI arguments and `DASH_*` environment
//! variables on top.

use std::time::Duration;

use dashboard_core::RenderConfig;
use serde::{Deserialize, Serialize};

/// Default WebSocket endpoint of the dashboard server's STOMP broker.
pub const DEFAULT_SERVER_URL: &str = "ws://127.0.0.1:8028/mq2tClientDashboard/websocket";

/// Default topic carrying card updates.
pub const DEFAULT_DATA_TOPIC: &str = "/topic/data";

/// All runtime configuration for the dashboard client.
///
/// # Example
///
/// ```rust
/// use dashboard_client::domain::ClientConfig;
///
/// let cfg = ClientConfig::default();
/// assert_eq!(cfg.data_topic, "/topic/data");
/// assert_eq!(cfg.reconnect_delay.as_millis(), 300);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// WebSocket URL of the STOMP endpoint.
    pub server_url: String,

    /// Topic the session subscribes to for card updates.
    pub data_topic: String,

    /// Delay between releasing the data subscription and re-subscribing after
    /// a save or a return to the dashboard.
    #[serde(with = "millis")]
    pub reconnect_delay: Duration,

    /// Upper bound on the WebSocket and STOMP handshakes.
    #[serde(with = "millis")]
    pub connect_timeout: Duration,

    /// Fallback log filter when `RUST_LOG` is unset.
    pub log_level: String,

    /// Connect immediately on startup instead of waiting for a `connect`
    /// command.
    pub autoconnect: bool,

    /// Dispatcher and sanitizer options.
    pub render: RenderConfig,
}

impl Default for ClientConfig {
    /// | Field            | Default                                              |
    /// |------------------|------------------------------------------------------|
    /// | server_url       | `ws://127.0.0.1:8028/mq2tClientDashboard/websocket`  |
    /// | data_topic       | `/topic/data`                                        |
    /// | reconnect_delay  | 300 ms                                               |
    /// | connect_timeout  | 10 s                                                 |
    /// | log_level        | `info`                                               |
    /// | autoconnect      | `false`                                              |
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            data_topic: DEFAULT_DATA_TOPIC.to_string(),
            reconnect_delay: Duration::from_millis(300),
            connect_timeout: Duration::from_secs(10),
            log_level: "info".to_string(),
            autoconnect: false,
            render: RenderConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Parses a TOML document.  Missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

/// Durations are written as integer milliseconds in the config file.
mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
