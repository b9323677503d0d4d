#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Input was not text, but the decoder only handles text records.
    #[error("Record is not text")]
    NotText,

    /// A hex carrier of binary data could not be converted to bytes.
    #[error("Invalid hex record: {0}")]
    Hex(#[from] hex::FromHexError),

    /// The outer record format did not match the line.
    #[error("Unable to parse record into {pattern:?}")]
    Frame { pattern: String },

    #[error("Not enough bytes")]
    TooShort {
        /// Number of bytes we got
        actual: usize,
        /// Minimum number of expected bytes
        minimum: usize,
    },

    #[error("Bad datagram start id {found:?}")]
    BadMagic { found: [u8; 4] },

    #[error("Failed to unpack datagram: {0}")]
    DecodeFault(String),

    /// Invalid configuration. Only produced while constructing decoders, never while
    /// decoding.
    #[error("Invalid config: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
