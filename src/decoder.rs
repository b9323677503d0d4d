use crate::prelude::*;
use crate::record::Record;

/// Raw message as received from a transport.
#[derive(Debug, Clone, PartialEq)]
pub enum Raw {
    Text(String),
    Bytes(Vec<u8>),
}

impl From<&str> for Raw {
    fn from(s: &str) -> Self {
        Raw::Text(s.to_string())
    }
}

impl From<String> for Raw {
    fn from(s: String) -> Self {
        Raw::Text(s)
    }
}

impl From<Vec<u8>> for Raw {
    fn from(dat: Vec<u8>) -> Self {
        Raw::Bytes(dat)
    }
}

impl From<&[u8]> for Raw {
    fn from(dat: &[u8]) -> Self {
        Raw::Bytes(dat.to_vec())
    }
}

/// A single item or a batch of items, processed in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Input<T> {
    Single(T),
    Batch(Vec<Input<T>>),
}

impl<T> From<T> for Input<T> {
    fn from(item: T) -> Self {
        Input::Single(item)
    }
}

/// Decodes one wire format into [Record]s.
///
/// Implementations hold only immutable, pre-compiled configuration so one decoder can be
/// shared by any number of threads.
pub trait Decoder: Send + Sync {
    /// Decode a single raw message.
    ///
    /// # Errors
    /// Any per-message decode failure. Callers decoding streams typically log and drop
    /// these rather than stopping.
    fn decode(&self, raw: &Raw) -> Result<Record>;

    /// Short description of the expected format, used in log messages.
    fn describe(&self) -> &str;
}
