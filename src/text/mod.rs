//! Text record decoding.
//!
//! A text record is framed into an envelope (`data_id`, `timestamp`) and a field string
//! by [RecordFramer], then the field string is matched against a [PatternSet] by
//! [FieldMatcher]. [RegexParser] does both.
mod framer;
mod matcher;
mod parser;
mod patterns;

pub use framer::*;
pub use matcher::*;
pub use parser::*;
pub use patterns::*;
