use tracing::debug;

use super::{FieldMatcher, PatternSet, RecordFramer};
use crate::decoder::{Decoder, Raw};
use crate::prelude::*;
use crate::record::Record;
use crate::timestamp::timestamp_or_now;

/// Decodes `<data_id> <timestamp> <field_string>` text records into [Record]s.
///
/// # Example
/// ```
/// use rvdecode::text::{FieldPatterns, RegexParser};
///
/// let patterns = FieldPatterns::from(vec![("HDT", r"\$HEHDT,(?P<heading>[\d.]+),T")]);
/// let parser = RegexParser::default().with_field_patterns(patterns.compile().unwrap());
///
/// let rec = parser
///     .parse_record("gyro 2024-01-01T00:00:00.000000Z $HEHDT,271.3,T")
///     .unwrap();
/// assert_eq!(rec.data_id, "gyro");
/// assert_eq!(rec.message_type.as_deref(), Some("HDT"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct RegexParser {
    framer: RecordFramer,
    matcher: FieldMatcher,
    default_data_id: Option<String>,
}

impl RegexParser {
    pub fn new(framer: RecordFramer, matcher: FieldMatcher) -> Self {
        RegexParser {
            framer,
            matcher,
            default_data_id: None,
        }
    }

    #[must_use]
    pub fn with_field_patterns(mut self, patterns: PatternSet) -> Self {
        self.matcher = FieldMatcher::new(patterns);
        self
    }

    /// Data id to use for records whose envelope does not include one.
    #[must_use]
    pub fn with_default_data_id(mut self, data_id: impl Into<String>) -> Self {
        self.default_data_id = Some(data_id.into());
        self
    }

    #[must_use]
    pub fn framer(&self) -> &RecordFramer {
        &self.framer
    }

    /// Parse a single text record.
    ///
    /// A record whose fields match none of the field patterns still decodes, it just has
    /// no fields.
    ///
    /// # Errors
    /// [Error::Frame] if the record format does not match.
    pub fn parse_record(&self, line: &str) -> Result<Record> {
        let frame = self.framer.frame(line)?;
        let matched = self.matcher.match_fields(frame.field_string);

        let record = Record {
            data_id: frame.data_id_or(self.default_data_id.as_deref()),
            message_type: matched.message_type,
            timestamp: timestamp_or_now(frame.timestamp),
            fields: matched.fields,
            metadata: None,
        };
        debug!(%record, "created parsed record");

        Ok(record)
    }
}

impl Decoder for RegexParser {
    fn decode(&self, raw: &Raw) -> Result<Record> {
        match raw {
            Raw::Text(line) => self.parse_record(line),
            Raw::Bytes(_) => Err(Error::NotText),
        }
    }

    fn describe(&self) -> &str {
        self.framer.record_format()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Value, UNKNOWN_DATA_ID};
    use crate::text::FieldPatterns;

    fn gga_parser() -> RegexParser {
        let patterns = FieldPatterns::from(vec![(
            "GPGGA",
            r"GPGGA,(?P<lat_raw>[\d.]+),(?P<lat_dir>[NS]),(?P<lon_raw>[\d.]+),(?P<lon_dir>[EW])",
        )]);
        RegexParser::default().with_field_patterns(patterns.compile().unwrap())
    }

    #[test]
    fn parses_envelope_and_fields() {
        let rec = gga_parser()
            .parse_record("BUOY1 2024-01-01T00:00:00.000000Z GPGGA,1234.56,N,07612.34,W")
            .unwrap();

        assert_eq!(rec.data_id, "BUOY1");
        assert!((rec.timestamp - 1704067200.0).abs() < 1e-6);
        assert_eq!(rec.message_type.as_deref(), Some("GPGGA"));
        assert_eq!(rec.fields["lat_raw"], Value::from("1234.56"));
        assert_eq!(rec.fields["lon_dir"], Value::from("W"));
        assert_eq!(rec.metadata, None);
    }

    #[test]
    fn bad_timestamp_uses_wall_clock() {
        let before = crate::timestamp::now();
        let rec = gga_parser()
            .parse_record("BUOY1 2024-01-01T00:00:00 GPGGA,1234.56,N,07612.34,W")
            .unwrap();
        assert!(rec.timestamp >= before);
        assert_eq!(rec.data_id, "BUOY1");
    }

    #[test]
    fn unmatched_fields_decode_without_fields() {
        let rec = gga_parser()
            .parse_record("BUOY1 2024-01-01T00:00:00.000000Z GPRMC,1,2,3")
            .unwrap();
        assert!(rec.fields.is_empty());
        assert_eq!(rec.message_type, None);
    }

    #[test]
    fn envelope_only_keeps_wire_id_and_time() {
        let rec = gga_parser()
            .parse_record("BUOY1 2024-01-01T00:00:00.000000Z")
            .unwrap();
        assert_eq!(rec.data_id, "BUOY1");
        assert_eq!(rec.timestamp, 1704067200.0);
        assert!(rec.fields.is_empty());
        assert_eq!(rec.message_type, None);
    }

    #[test]
    fn missing_data_id_falls_back() {
        let rec = gga_parser()
            .parse_record("GPGGA,1234.56,N,07612.34,W")
            .unwrap();
        assert_eq!(rec.data_id, UNKNOWN_DATA_ID);
        assert_eq!(rec.message_type.as_deref(), Some("GPGGA"));

        let rec = gga_parser()
            .with_default_data_id("gnss")
            .parse_record("GPGGA,1234.56,N,07612.34,W")
            .unwrap();
        assert_eq!(rec.data_id, "gnss");
    }

    #[test]
    fn bytes_are_not_text() {
        let zult = gga_parser().decode(&Raw::Bytes(b"GPGGA".to_vec()));
        assert!(matches!(zult, Err(Error::NotText)));
    }
}
