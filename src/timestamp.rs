//! Record timestamp parsing.
use chrono::{NaiveDateTime, Utc};
use tracing::debug;

/// Wire format of text record timestamps, e.g., `2024-01-01T00:00:00.000000Z`. The
/// fraction may be absent or have up to nine digits.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

/// Current wall-clock time as Unix epoch seconds.
#[must_use]
pub fn now() -> f64 {
    to_epoch_seconds(Utc::now().naive_utc())
}

/// Convert `text` in [TIMESTAMP_FORMAT] to Unix epoch seconds. The trailing `Z` means
/// the time is always taken as UTC.
///
/// Returns `None` if `text` is not in the expected format.
///
/// # Example
/// ```
/// use rvdecode::timestamp::convert_timestamp;
///
/// assert_eq!(convert_timestamp("1970-01-01T00:00:01.500000Z"), Some(1.5));
/// assert_eq!(convert_timestamp("yesterday"), None);
/// ```
#[must_use]
pub fn convert_timestamp(text: &str) -> Option<f64> {
    match NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT) {
        Ok(dt) => Some(to_epoch_seconds(dt)),
        Err(err) => {
            debug!(timestamp = text, %err, "incorrect datetime format");
            None
        }
    }
}

/// Like [convert_timestamp], but falls back to [now] so a timestamp is always produced.
#[must_use]
pub fn timestamp_or_now(text: Option<&str>) -> f64 {
    text.and_then(convert_timestamp).unwrap_or_else(now)
}

fn to_epoch_seconds(dt: NaiveDateTime) -> f64 {
    let utc = dt.and_utc();
    utc.timestamp() as f64 + f64::from(utc.timestamp_subsec_nanos()) / 1e9
}
