#![doc = include_str!("../README.md")]

mod error;

pub mod config;
pub mod decoder;
pub mod kmb;
pub mod normalize;
pub mod pipeline;
pub mod record;
pub mod scan;
pub mod simulate;
pub mod text;
pub mod timestamp;

pub use config::PipelineConfig;
pub use decoder::{Decoder, Input, Raw};
pub use error::{Error, Result};
pub use kmb::{KmbDatagram, KmbDecoder};
pub use normalize::Normalizer;
pub use pipeline::{Output, OutputMode, Pipeline};
pub use record::{Fields, Record, Value};
pub use text::RegexParser;

pub(crate) mod prelude {
    pub use crate::error::{Error, Result};
}
