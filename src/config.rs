//! Declarative pipeline configuration.
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::normalize::LatLonMap;
use crate::prelude::*;
use crate::text::FieldPatterns;

/// Wire format a pipeline decodes.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// `<data_id> <timestamp> <field_string>` text records
    #[default]
    Text,
    /// Kongsberg Seapath `#KMB` binary datagrams
    Kmb,
}

/// Configuration for a [Pipeline](crate::Pipeline).
///
/// Usually loaded from JSON, where every key is optional:
/// ```json
/// {
///   "format": "text",
///   "record_format": "^(?P<data_id>\\w+)\\s+(?P<field_string>.*)",
///   "field_patterns": {"GPGGA": "GPGGA,(?P<lat_raw>[\\d.]+),(?P<lat_dir>[NS])"},
///   "default_data_id": "gnss",
///   "skip_fields": ["serial"],
///   "lat_lon_map": {"latitude": ["lat_raw", "lat_dir"]},
///   "quiet": false,
///   "verbose": false,
///   "return_json": false,
///   "return_das_record": false
/// }
/// ```
/// `field_patterns` may be a list of patterns or a mapping of message type to pattern.
///
/// # Example
/// ```
/// use rvdecode::config::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .field_patterns(vec![r"(?P<heading>[\d.]+),T"])
///     .default_data_id("gyro")
///     .build();
/// assert!(config.validate().is_ok());
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TypedBuilder)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    #[builder(default)]
    pub format: Format,
    /// Outer record format; defaults to [DEFAULT_RECORD_FORMAT](crate::text::DEFAULT_RECORD_FORMAT).
    #[builder(default, setter(strip_option, into))]
    pub record_format: Option<String>,
    #[builder(default, setter(strip_option, into))]
    pub field_patterns: Option<FieldPatterns>,
    #[builder(default, setter(strip_option, into))]
    pub default_data_id: Option<String>,
    /// Normalize record fields after decoding.
    #[builder(default = true)]
    pub normalize: bool,
    /// Fields left as strings by normalization.
    #[builder(default)]
    pub skip_fields: Vec<String>,
    /// Decimal degree fields to derive from NMEA coordinate pairs.
    #[builder(default)]
    pub lat_lon_map: LatLonMap,
    /// Do not log records that fail to decode.
    #[builder(default)]
    pub quiet: bool,
    /// Log the raw record and expected format of records that fail to decode.
    #[builder(default)]
    pub verbose: bool,
    /// Produce JSON encoded records.
    #[builder(default)]
    pub return_json: bool,
    /// Accepted for compatibility with existing configurations. Records are already produced
    /// whenever `return_json` is not set, so this only conflicts with `return_json`.
    #[builder(default)]
    pub return_das_record: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig::builder().build()
    }
}

impl PipelineConfig {
    /// # Errors
    /// [Error::Config] if the text is not a valid configuration.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    /// # Errors
    /// [Error::Config] if the data read is not a valid configuration, or [Error::Io] if
    /// reading fails.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        Self::from_json(&text)
    }

    /// # Errors
    /// [Error::Io] if the file cannot be read, otherwise as [Self::from_reader].
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_reader(BufReader::new(File::open(path)?))
    }

    /// Check for conflicting options.
    ///
    /// # Errors
    /// [Error::Config] describing the first conflict found.
    pub fn validate(&self) -> Result<()> {
        if self.return_json && self.return_das_record {
            return Err(Error::Config(
                "only one of return_json and return_das_record may be true".to_string(),
            ));
        }
        if self.format == Format::Kmb
            && (self.record_format.is_some() || self.field_patterns.is_some())
        {
            return Err(Error::Config(
                "record_format and field_patterns only apply to text records".to_string(),
            ));
        }
        if self
            .default_data_id
            .as_deref()
            .is_some_and(|id| id.trim().is_empty())
        {
            return Err(Error::Config(
                "default_data_id must not be empty".to_string(),
            ));
        }
        for (name, source) in &self.lat_lon_map {
            if source.value.is_empty() || source.direction.is_empty() {
                return Err(Error::Config(format!(
                    "lat_lon_map entry {name:?} must name a value and a direction field"
                )));
            }
        }
        Ok(())
    }
}
