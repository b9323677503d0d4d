//! Field type coercion and NMEA coordinate conversion.
use std::collections::HashSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::record::{Fields, Record, Value};

/// Names of the raw value and hemisphere fields a coordinate is derived from.
///
/// Serialized as a `[value_field, direction_field]` pair.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(from = "(String, String)", into = "(String, String)")]
pub struct CoordinateSource {
    pub value: String,
    pub direction: String,
}

impl CoordinateSource {
    pub fn new(value: impl Into<String>, direction: impl Into<String>) -> Self {
        CoordinateSource {
            value: value.into(),
            direction: direction.into(),
        }
    }
}

impl From<(String, String)> for CoordinateSource {
    fn from((value, direction): (String, String)) -> Self {
        CoordinateSource { value, direction }
    }
}

impl From<CoordinateSource> for (String, String) {
    fn from(source: CoordinateSource) -> Self {
        (source.value, source.direction)
    }
}

/// Result field name to the fields it is derived from.
pub type LatLonMap = IndexMap<String, CoordinateSource>;

/// Normalizes record fields for downstream consumers:
///
/// 1. Numeric strings become integers or floats, except for skipped fields.
/// 2. Decimal degree fields are added for each configured NMEA coordinate pair.
///
/// Normalization never fails: values that do not convert stay as they are and coordinates
/// that cannot be derived are left out.
///
/// # Example
/// ```
/// use rvdecode::normalize::{CoordinateSource, Normalizer};
/// use rvdecode::{Fields, Value};
///
/// let normalizer = Normalizer::default()
///     .with_coordinate("latitude", CoordinateSource::new("lat_raw", "lat_dir"));
///
/// let mut fields = Fields::new();
/// fields.insert("lat_raw".into(), "2156.8986".into());
/// fields.insert("lat_dir".into(), "S".into());
///
/// let fields = normalizer.normalize_fields(&fields);
/// let lat = fields["latitude"].as_f64().unwrap();
/// assert!((lat + 21.94831).abs() < 1e-4);
/// assert_eq!(fields["lat_raw"], Value::Float(2156.8986));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    skip_fields: HashSet<String>,
    lat_lon_map: LatLonMap,
}

impl Normalizer {
    pub fn new(skip_fields: HashSet<String>, lat_lon_map: LatLonMap) -> Self {
        Normalizer {
            skip_fields,
            lat_lon_map,
        }
    }

    /// Leave `name` as it is during numeric conversion.
    #[must_use]
    pub fn with_skip_field(mut self, name: impl Into<String>) -> Self {
        self.skip_fields.insert(name.into());
        self
    }

    /// Derive decimal degrees into `name` from `source`.
    #[must_use]
    pub fn with_coordinate(mut self, name: impl Into<String>, source: CoordinateSource) -> Self {
        self.lat_lon_map.insert(name.into(), source);
        self
    }

    /// Normalized copy of `fields`.
    #[must_use]
    pub fn normalize_fields(&self, fields: &Fields) -> Fields {
        let mut new_fields: Fields = fields
            .iter()
            .map(|(key, val)| {
                let val = if self.skip_fields.contains(key) {
                    val.clone()
                } else {
                    convert_number(val)
                };
                (key.clone(), val)
            })
            .collect();

        for (name, source) in &self.lat_lon_map {
            let Some(raw_val) = new_fields.get(&source.value) else {
                continue;
            };
            let raw_dir = new_fields.get(&source.direction);
            match nmea_to_decimal(raw_val, raw_dir) {
                Some(decimal) => {
                    new_fields.insert(name.clone(), Value::Float(decimal));
                }
                None => {
                    trace!(
                        field = name.as_str(),
                        source = source.value.as_str(),
                        "could not convert NMEA coordinate"
                    );
                }
            }
        }

        new_fields
    }

    /// Normalize the fields of `record` in place.
    pub fn normalize(&self, record: &mut Record) {
        if record.fields.is_empty() {
            return;
        }
        record.fields = self.normalize_fields(&record.fields);
    }

    /// Decode a JSON record (see [Record::from_json]) and normalize it. Returns `None` if
    /// the text is not a JSON record.
    #[must_use]
    pub fn normalize_json(&self, text: &str) -> Option<Record> {
        let mut record = Record::from_json(text).ok()?;
        self.normalize(&mut record);
        Some(record)
    }
}

/// Convert string values that look like numbers. Integers are optionally signed digit
/// strings; anything else that parses as a float becomes a float.
#[must_use]
pub fn convert_number(val: &Value) -> Value {
    let Value::String(s) = val else {
        return val.clone();
    };
    let digits = s.strip_prefix('-').unwrap_or(s);
    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(i) = s.parse::<i64>() {
            return Value::Integer(i);
        }
    }
    match s.trim().parse::<f64>() {
        Ok(f) => Value::Float(f),
        Err(_) => val.clone(),
    }
}

/// Convert an NMEA `DDDMM.MMMM` coordinate to decimal degrees, negative for `S` and `W`
/// hemispheres.
///
/// `value` may be a number or a numeric string. Returns `None` if it is neither.
#[must_use]
pub fn nmea_to_decimal(value: &Value, direction: Option<&Value>) -> Option<f64> {
    let val = match value {
        Value::Integer(_) | Value::Float(_) => value.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        Value::Boolean(_) => return None,
    };
    if !val.is_finite() {
        return None;
    }

    let degrees = (val / 100.0).floor();
    let minutes = val.rem_euclid(100.0);
    let decimal = degrees + minutes / 60.0;

    let southern_or_western = direction
        .map(|d| d.to_string().to_uppercase())
        .map_or(false, |d| d == "S" || d == "W");
    Some(if southern_or_western { -decimal } else { decimal })
}
