//! Card header timestamps.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

/// Shown when a message carries no usable timestamp.
pub const UNDEFINED_TIMESTAMP: &str = "undefined";

const TIME_FORMAT: &str = "%H:%M:%S";

/// Zone a timestamp is rendered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampZone {
    #[default]
    Local,
    Utc,
}

/// Formats epoch milliseconds as zero-padded `HH:MM:SS`.
///
/// Returns [`UNDEFINED_TIMESTAMP`] for `None` and for values outside the
/// representable date range.
pub fn format_timestamp(epoch_ms: Option<i64>, zone: TimestampZone) -> String {
    let Some(utc) = epoch_ms.and_then(DateTime::<Utc>::from_timestamp_millis) else {
        return UNDEFINED_TIMESTAMP.to_string();
    };
    match zone {
        TimestampZone::Utc => utc.format(TIME_FORMAT).to_string(),
        TimestampZone::Local => utc.with_timezone(&Local).format(TIME_FORMAT).to_string(),
    }
}
