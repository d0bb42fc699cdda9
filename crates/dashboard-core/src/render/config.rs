//! Render configuration.

use serde::{Deserialize, Serialize};

use crate::render::sanitizer::AllowList;
use crate::render::timestamp::TimestampZone;

/// Default receiver id of the dashboard root.
pub const DEFAULT_DASHBOARD_ROOT_ID: &str = "dashboard";

/// Options for the dispatcher and its handlers.
///
/// Every field has a default, so a partial TOML table is enough:
///
/// ```toml
/// [render]
/// dashboard_root_id = "home"
/// timestamp_zone = "utc"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Receiver id whose markup replaces the whole dashboard surface.
    pub dashboard_root_id: String,
    /// Zone used for the `HH:MM:SS` card timestamp.
    pub timestamp_zone: TimestampZone,
    /// Also put soft errors (e.g. a structured payload without `data`) on the
    /// error banner.  They are always logged.
    pub surface_soft_errors: bool,
    /// Tags and attributes that survive sanitization.
    pub allow_list: AllowList,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            dashboard_root_id: DEFAULT_DASHBOARD_ROOT_ID.to_string(),
            timestamp_zone: TimestampZone::default(),
            surface_soft_errors: false,
            allow_list: AllowList::default(),
        }
    }
}
