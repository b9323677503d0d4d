use std::collections::HashSet;

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::config::{Format, PipelineConfig};
use crate::decoder::{Decoder, Input, Raw};
use crate::kmb::{KmbDecoder, KMB_DATA_ID};
use crate::normalize::Normalizer;
use crate::prelude::*;
use crate::record::Record;
use crate::text::{FieldMatcher, RecordFramer, RegexParser};

/// What a [Pipeline] produces for each decoded record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputMode {
    #[default]
    Record,
    Json,
}

/// Result of processing an [Input].
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    /// The input could not be decoded.
    Nothing,
    Record(Record),
    Json(String),
    /// One output per batch item, in input order.
    Batch(Vec<Output>),
}

impl Output {
    #[must_use]
    pub fn is_nothing(&self) -> bool {
        matches!(self, Output::Nothing)
    }

    /// The decoded record, if this is [Output::Record].
    #[must_use]
    pub fn into_record(self) -> Option<Record> {
        match self {
            Output::Record(record) => Some(record),
            _ => None,
        }
    }
}

/// Decodes raw messages into normalized records.
///
/// A pipeline is built once from configuration and is then immutable, so a single instance
/// can be shared between threads. Malformed messages never produce errors, they produce
/// nothing, optionally logging a warning.
///
/// # Example
/// ```
/// use rvdecode::{Pipeline, PipelineConfig, Value};
/// use rvdecode::normalize::CoordinateSource;
///
/// let config = PipelineConfig::builder()
///     .field_patterns(vec![(
///         "GPGGA",
///         r"GPGGA,(?P<lat_raw>[\d.]+),(?P<lat_dir>[NS]),(?P<lon_raw>[\d.]+),(?P<lon_dir>[EW])",
///     )])
///     .lat_lon_map(
///         [
///             ("latitude".to_string(), CoordinateSource::new("lat_raw", "lat_dir")),
///             ("longitude".to_string(), CoordinateSource::new("lon_raw", "lon_dir")),
///         ]
///         .into_iter()
///         .collect(),
///     )
///     .build();
/// let pipeline = Pipeline::from_config(&config).unwrap();
///
/// let rec = pipeline
///     .decode(&"BUOY1 2024-01-01T00:00:00.000000Z GPGGA,1234.56,N,07612.34,W".into())
///     .unwrap();
/// assert_eq!(rec.data_id, "BUOY1");
/// assert_eq!(rec.message_type.as_deref(), Some("GPGGA"));
/// assert!(rec.fields["longitude"].as_f64().unwrap() < 0.0);
///
/// assert!(pipeline.decode(&b"\x00\x01".as_slice().into()).is_none());
/// ```
pub struct Pipeline {
    decoder: Box<dyn Decoder>,
    normalizer: Option<Normalizer>,
    output: OutputMode,
    quiet: bool,
    verbose: bool,
}

impl Pipeline {
    /// Pipeline using `decoder` with no normalization, producing [Output::Record].
    pub fn new(decoder: impl Decoder + 'static) -> Self {
        Pipeline {
            decoder: Box::new(decoder),
            normalizer: None,
            output: OutputMode::default(),
            quiet: false,
            verbose: false,
        }
    }

    /// Build a pipeline from configuration. This compiles all patterns.
    ///
    /// # Errors
    /// [Error::Config] if the configuration is invalid or contains conflicting options.
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        config.validate()?;

        let decoder: Box<dyn Decoder> = match config.format {
            Format::Text => {
                let framer = match config.record_format {
                    Some(ref format) => RecordFramer::new(format)?,
                    None => RecordFramer::default(),
                };
                let matcher = match config.field_patterns {
                    Some(ref patterns) => FieldMatcher::new(patterns.compile()?),
                    None => FieldMatcher::default(),
                };
                let mut parser = RegexParser::new(framer, matcher);
                if let Some(ref data_id) = config.default_data_id {
                    parser = parser.with_default_data_id(data_id);
                }
                Box::new(parser)
            }
            Format::Kmb => Box::new(KmbDecoder::new(
                config.default_data_id.as_deref().unwrap_or(KMB_DATA_ID),
            )),
        };

        let normalizer = config.normalize.then(|| {
            Normalizer::new(
                config.skip_fields.iter().cloned().collect::<HashSet<_>>(),
                config.lat_lon_map.clone(),
            )
        });
        let output = if config.return_json {
            OutputMode::Json
        } else {
            OutputMode::Record
        };
        debug!(format = ?config.format, ?output, "built pipeline");

        Ok(Pipeline {
            decoder,
            normalizer,
            output,
            quiet: config.quiet,
            verbose: config.verbose,
        })
    }

    #[must_use]
    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = Some(normalizer);
        self
    }

    #[must_use]
    pub fn with_output(mut self, output: OutputMode) -> Self {
        self.output = output;
        self
    }

    /// Suppress warnings for messages that fail to decode. Takes precedence over
    /// [Self::verbose].
    #[must_use]
    pub fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }

    /// Include the raw message and expected format in decode warnings.
    #[must_use]
    pub fn verbose(mut self) -> Self {
        self.verbose = true;
        self
    }

    /// Decode and normalize a single message. Returns `None` if it cannot be decoded.
    pub fn decode(&self, raw: &Raw) -> Option<Record> {
        match self.decoder.decode(raw) {
            Ok(mut record) => {
                if let Some(ref normalizer) = self.normalizer {
                    normalizer.normalize(&mut record);
                }
                Some(record)
            }
            Err(err) => {
                if self.verbose && !self.quiet {
                    warn!(
                        %err,
                        record = ?raw,
                        format = self.decoder.describe(),
                        "unable to decode record"
                    );
                } else if !self.quiet {
                    warn!(%err, "unable to decode record");
                }
                None
            }
        }
    }

    /// Process a single message or a batch of messages.
    ///
    /// Batches are decoded in parallel; the resulting [Output::Batch] has the same order as
    /// the input.
    pub fn process(&self, input: &Input<Raw>) -> Output {
        match input {
            Input::Single(raw) => self.output(self.decode(raw)),
            Input::Batch(items) => {
                Output::Batch(items.par_iter().map(|item| self.process(item)).collect())
            }
        }
    }

    fn output(&self, record: Option<Record>) -> Output {
        let Some(record) = record else {
            return Output::Nothing;
        };
        match self.output {
            OutputMode::Record => Output::Record(record),
            OutputMode::Json => match record.to_json() {
                Ok(json) => Output::Json(json),
                Err(err) => {
                    if !self.quiet {
                        warn!(%err, %record, "unable to encode record");
                    }
                    Output::Nothing
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kmb::KmbDatagram;
    use crate::record::Value;
    use crate::text::FieldPatterns;

    fn text_pipeline() -> Pipeline {
        let patterns = FieldPatterns::from(vec![("HDT", r"\$HEHDT,(?P<heading>[\d.]+),T")]);
        Pipeline::new(RegexParser::default().with_field_patterns(patterns.compile().unwrap()))
            .with_normalizer(Normalizer::default())
    }

    #[test]
    fn pipeline_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Pipeline>();
    }

    #[test]
    fn decodes_and_normalizes() {
        let rec = text_pipeline()
            .decode(&"gyro 2024-01-01T00:00:00.000000Z $HEHDT,271.3,T".into())
            .unwrap();
        assert_eq!(rec.fields["heading"], Value::Float(271.3));
    }

    #[test]
    fn without_normalizer_fields_are_strings() {
        let patterns = FieldPatterns::from(vec![r"\$HEHDT,(?P<heading>[\d.]+),T"]);
        let pipeline =
            Pipeline::new(RegexParser::default().with_field_patterns(patterns.compile().unwrap()));
        let rec = pipeline.decode(&"$HEHDT,271.3,T".into()).unwrap();
        assert_eq!(rec.fields["heading"], Value::from("271.3"));
    }

    #[test]
    fn wrong_input_type_is_nothing() {
        let pipeline = text_pipeline().quiet();
        assert_eq!(
            pipeline.process(&Input::Single(Raw::Bytes(vec![1, 2, 3]))),
            Output::Nothing
        );
        assert_eq!(pipeline.process(&Input::Single("".into())), Output::Nothing);
    }

    #[test]
    fn batch_preserves_order() {
        let pipeline = text_pipeline().verbose();
        let lines: Vec<Input<Raw>> = (0..50)
            .map(|i| {
                if i % 7 == 0 {
                    Input::Single(Raw::Bytes(vec![i]))
                } else {
                    Input::Single(Raw::from(format!(
                        "gyro{i} 2024-01-01T00:00:00.000000Z $HEHDT,{i}.5,T"
                    )))
                }
            })
            .collect();

        let Output::Batch(outputs) = pipeline.process(&Input::Batch(lines)) else {
            panic!("expected batch output");
        };
        assert_eq!(outputs.len(), 50);
        for (i, out) in outputs.into_iter().enumerate() {
            if i % 7 == 0 {
                assert!(out.is_nothing(), "{i}: {out:?}");
                continue;
            }
            let rec = out.into_record().unwrap();
            assert_eq!(rec.data_id, format!("gyro{i}"));
            assert_eq!(rec.fields["heading"], Value::Float(i as f64 + 0.5));
        }
    }

    #[test]
    fn nested_batches() {
        let pipeline = text_pipeline();
        let input = Input::Batch(vec![
            Input::Single("$HEHDT,1.0,T".into()),
            Input::Batch(vec![Input::Single("$HEHDT,2.0,T".into())]),
        ]);
        let Output::Batch(outputs) = pipeline.process(&input) else {
            panic!("expected batch output");
        };
        assert!(matches!(outputs[0], Output::Record(_)));
        assert!(matches!(&outputs[1], Output::Batch(inner) if inner.len() == 1));
    }

    #[test]
    fn json_output() {
        let pipeline = text_pipeline().with_output(OutputMode::Json);
        let Output::Json(json) =
            pipeline.process(&Input::Single("gyro 2024-01-01T00:00:00.000000Z $HEHDT,271.3,T".into()))
        else {
            panic!("expected json output");
        };
        let rec = Record::from_json(&json).unwrap();
        assert_eq!(rec.data_id, "gyro");
        assert_eq!(rec.timestamp, 1704067200.0);
        assert_eq!(rec.fields["heading"], Value::Float(271.3));
    }

    #[test]
    fn das_record_output_is_record() {
        let config = PipelineConfig::builder().return_das_record(true).build();
        let pipeline = Pipeline::from_config(&config).unwrap();
        let output =
            pipeline.process(&Input::Single("gyro 2024-01-01T00:00:00.000000Z 271.3".into()));
        assert_eq!(output.into_record().unwrap().data_id, "gyro");
    }

    #[test]
    fn kmb_pipeline_from_config() {
        let config = PipelineConfig::builder()
            .format(Format::Kmb)
            .default_data_id("seapath")
            .build();
        let pipeline = Pipeline::from_config(&config).unwrap();

        let dgm = KmbDatagram {
            length: 60,
            version: 1,
            utc_seconds: 10,
            utc_nanoseconds: 250_000_000,
            status: 3,
            latitude: 45.0,
            longitude: -125.0,
            ellipsoid_height: 10.0,
            roll: 0.0,
            pitch: 0.0,
            heading: 90.0,
            heave: 0.0,
            roll_rate: 0.0,
        };
        let rec = pipeline.decode(&Raw::Bytes(dgm.encode().to_vec())).unwrap();
        assert_eq!(rec.data_id, "seapath");
        assert_eq!(rec.timestamp, 10.25);
        assert_eq!(rec.fields["status"], Value::Integer(3));
        assert_eq!(rec.fields["heading_deg"], Value::Float(90.0));

        // Same datagram relayed as hex text.
        let rec = pipeline.decode(&Raw::Text(dgm.to_hex())).unwrap();
        assert_eq!(rec.fields["longitude"], Value::Float(-125.0));

        assert!(pipeline.decode(&Raw::Bytes(dgm.encode()[..59].to_vec())).is_none());
    }

    #[test]
    fn config_errors_abort_construction() {
        let config = PipelineConfig::builder()
            .return_json(true)
            .return_das_record(true)
            .build();
        assert!(matches!(
            Pipeline::from_config(&config),
            Err(Error::Config(_))
        ));

        let config = PipelineConfig::builder()
            .field_patterns(vec!["(unclosed"])
            .build();
        assert!(matches!(
            Pipeline::from_config(&config),
            Err(Error::Config(_))
        ));

        let config = PipelineConfig::builder().record_format("[").build();
        assert!(matches!(
            Pipeline::from_config(&config),
            Err(Error::Config(_))
        ));

        // binary records would otherwise carry an empty data id
        let config = PipelineConfig::builder()
            .format(Format::Kmb)
            .default_data_id("")
            .build();
        assert!(matches!(
            Pipeline::from_config(&config),
            Err(Error::Config(_))
        ));
    }
}
