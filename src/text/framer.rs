use regex::Regex;

use crate::prelude::*;
use crate::record::UNKNOWN_DATA_ID;

/// Default outer record format. Matches `<data_id> <timestamp> <field_string>` where the
/// `data_id` and `timestamp` pair is optional and the field string may be empty.
pub const DEFAULT_RECORD_FORMAT: &str =
    r"^(?:(?P<data_id>\w+)\s+(?P<timestamp>[0-9TZ:\-\.]+)(?:\s+|$))?(?P<field_string>(?s:.*))";

/// Outer envelope of a text record.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame<'a> {
    pub data_id: Option<&'a str>,
    pub timestamp: Option<&'a str>,
    /// Everything after the envelope with trailing whitespace removed.
    pub field_string: &'a str,
}

impl<'a> Frame<'a> {
    /// Resolve the data id: the framed id, then `default`, then [UNKNOWN_DATA_ID].
    #[must_use]
    pub fn data_id_or(&self, default: Option<&str>) -> String {
        self.data_id
            .filter(|id| !id.is_empty())
            .or(default.filter(|id| !id.is_empty()))
            .unwrap_or(UNKNOWN_DATA_ID)
            .to_string()
    }
}

/// Splits the envelope (`data_id`, `timestamp`) from the field string of a text record.
///
/// The record format is a regular expression with optional named groups `data_id`,
/// `timestamp`, and `field_string`. It is applied once at the start of the line.
#[derive(Debug, Clone)]
pub struct RecordFramer {
    pattern: Regex,
}

impl Default for RecordFramer {
    fn default() -> Self {
        RecordFramer {
            pattern: Regex::new(DEFAULT_RECORD_FORMAT).expect("default record format is valid"),
        }
    }
}

impl RecordFramer {
    /// # Errors
    /// [Error::Config] if `record_format` is not a valid regular expression.
    pub fn new(record_format: &str) -> Result<Self> {
        let pattern = Regex::new(record_format)
            .map_err(|e| Error::Config(format!("invalid record format {record_format:?}: {e}")))?;
        Ok(RecordFramer { pattern })
    }

    /// The record format this framer applies.
    #[must_use]
    pub fn record_format(&self) -> &str {
        self.pattern.as_str()
    }

    /// # Errors
    /// [Error::Frame] if `line` is empty or the record format does not match at the start
    /// of the line.
    pub fn frame<'a>(&self, line: &'a str) -> Result<Frame<'a>> {
        let caps = match self.pattern.captures(line) {
            Some(caps) if !line.is_empty() && caps.get(0).map_or(false, |m| m.start() == 0) => {
                caps
            }
            _ => {
                return Err(Error::Frame {
                    pattern: self.pattern.as_str().to_string(),
                })
            }
        };

        Ok(Frame {
            data_id: caps.name("data_id").map(|m| m.as_str()),
            timestamp: caps.name("timestamp").map(|m| m.as_str()),
            field_string: caps
                .name("field_string")
                .map_or("", |m| m.as_str().trim_end()),
        })
    }
}
