use std::fmt::Display;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::prelude::*;

/// `data_id` used when neither the record nor the configuration provide one.
pub const UNKNOWN_DATA_ID: &str = "unknown";

/// A single field value.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Value {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl Value {
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric value as a float. Integers are widened, strings are not parsed.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::String(s) => write!(f, "{s}"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<f32> for Value {
    fn from(x: f32) -> Self {
        Value::Float(f64::from(x))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

/// Record fields, in the order they were matched or unpacked.
pub type Fields = IndexMap<String, Value>;

/// Canonical decoded message, independent of the wire format it came from.
///
/// # Example
/// ```
/// use rvdecode::{Record, Value};
///
/// let rec: Record = serde_json::from_str(
///     r#"{"data_id": "gyro", "timestamp": 1.5, "fields": {"heading": 271.3}}"#,
/// ).unwrap();
/// assert_eq!(rec.fields["heading"], Value::Float(271.3));
/// assert_eq!(rec.message_type, None);
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Record {
    pub data_id: String,
    pub message_type: Option<String>,
    /// Unix epoch seconds
    pub timestamp: f64,
    #[serde(default)]
    pub fields: Fields,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<IndexMap<String, Value>>,
}

impl Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Record{{data_id: {}, message_type: {:?}, timestamp: {}, fields:[len={}]}}",
            self.data_id,
            self.message_type,
            self.timestamp,
            self.fields.len()
        )
    }
}

impl Record {
    pub fn new(data_id: impl Into<String>, timestamp: f64) -> Self {
        Record {
            data_id: data_id.into(),
            message_type: None,
            timestamp,
            fields: Fields::new(),
            metadata: None,
        }
    }

    #[must_use]
    pub fn with_message_type(mut self, message_type: impl Into<String>) -> Self {
        self.message_type = Some(message_type.into());
        self
    }

    #[must_use]
    pub fn with_fields(mut self, fields: Fields) -> Self {
        self.fields = fields;
        self
    }

    /// Encode as a JSON object string. Non-finite floats are encoded as `null`.
    ///
    /// # Errors
    /// [Error::DecodeFault] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::DecodeFault(e.to_string()))
    }

    /// Decode a record from JSON.
    ///
    /// Accepts either the nested shape produced by [Record::to_json] or a flat object where
    /// every key other than `data_id`, `timestamp`, and `message_type` is a field. A missing
    /// `data_id` becomes [UNKNOWN_DATA_ID] and a missing `timestamp` becomes now.
    ///
    /// # Errors
    /// [Error::DecodeFault] if the text is not a JSON object of scalar values.
    pub fn from_json(text: &str) -> Result<Record> {
        let mut obj: IndexMap<String, serde_json::Value> =
            serde_json::from_str(text).map_err(|e| Error::DecodeFault(e.to_string()))?;

        let data_id = match obj.shift_remove("data_id") {
            Some(serde_json::Value::String(s)) if !s.is_empty() => s,
            _ => UNKNOWN_DATA_ID.to_string(),
        };
        let timestamp = obj
            .shift_remove("timestamp")
            .and_then(|v| v.as_f64())
            .unwrap_or_else(crate::timestamp::now);
        let message_type = match obj.shift_remove("message_type") {
            Some(serde_json::Value::String(s)) => Some(s),
            _ => None,
        };
        let metadata = match obj.shift_remove("metadata") {
            Some(v) if !v.is_null() => Some(
                serde_json::from_value::<IndexMap<String, Value>>(v)
                    .map_err(|e| Error::DecodeFault(e.to_string()))?,
            ),
            _ => None,
        };

        let fields = match obj.shift_remove("fields") {
            Some(nested) => serde_json::from_value::<Fields>(nested)
                .map_err(|e| Error::DecodeFault(e.to_string()))?,
            None => {
                let mut fields = Fields::with_capacity(obj.len());
                for (key, val) in obj {
                    let val = serde_json::from_value::<Value>(val)
                        .map_err(|e| Error::DecodeFault(format!("field {key}: {e}")))?;
                    fields.insert(key, val);
                }
                fields
            }
        };

        Ok(Record {
            data_id,
            message_type,
            timestamp,
            fields,
            metadata,
        })
    }
}
