//! Kongsberg Seapath `#KMB` binary datagrams.
//!
//! Layout (big-endian):
//!
//! |Field|Type|Bytes|
//! |---|---|---|
//! |Start id (`#KMB`)|bytes|4|
//! |Datagram length|u16|2|
//! |Datagram version|u16|2|
//! |UTC seconds|u32|4|
//! |UTC nanoseconds|u32|4|
//! |Status|u32|4|
//! |Latitude|f64|8|
//! |Longitude|f64|8|
//! |Ellipsoid height|f32|4|
//! |Roll|f32|4|
//! |Pitch|f32|4|
//! |Heading|f32|4|
//! |Heave|f32|4|
//! |Roll rate|f32|4|
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::decoder::{Decoder, Raw};
use crate::prelude::*;
use crate::record::{Fields, Record, Value};

/// Datagram start id
pub const KMB_MAGIC: [u8; 4] = *b"#KMB";
/// Message type assigned to decoded datagrams
pub const KMB_MESSAGE_TYPE: &str = "kmb";
/// Default data id for decoded datagrams
pub const KMB_DATA_ID: &str = "seapath_kmb";

/// A single `#KMB` datagram.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct KmbDatagram {
    pub length: u16,
    pub version: u16,
    pub utc_seconds: u32,
    pub utc_nanoseconds: u32,
    pub status: u32,
    pub latitude: f64,
    pub longitude: f64,
    pub ellipsoid_height: f32,
    pub roll: f32,
    pub pitch: f32,
    pub heading: f32,
    pub heave: f32,
    pub roll_rate: f32,
}

impl KmbDatagram {
    /// Size of an encoded datagram
    pub const LEN: usize = 60;

    /// Decode the first [Self::LEN] bytes of `buf`. Any additional bytes are ignored.
    ///
    /// The start id must be at the very start of `buf`; no attempt is made to search for it.
    ///
    /// # Errors
    /// [Error::TooShort] if `buf` is shorter than [Self::LEN], [Error::BadMagic] if it does
    /// not start with [KMB_MAGIC], or [Error::DecodeFault] if unpacking fails.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < Self::LEN {
            return Err(Error::TooShort {
                actual: buf.len(),
                minimum: Self::LEN,
            });
        }
        let mut r = Unpacker::new(&buf[..Self::LEN]);

        let found: [u8; 4] = r.take()?;
        if found != KMB_MAGIC {
            return Err(Error::BadMagic { found });
        }

        Ok(KmbDatagram {
            length: u16::from_be_bytes(r.take()?),
            version: u16::from_be_bytes(r.take()?),
            utc_seconds: u32::from_be_bytes(r.take()?),
            utc_nanoseconds: u32::from_be_bytes(r.take()?),
            status: u32::from_be_bytes(r.take()?),
            latitude: f64::from_be_bytes(r.take()?),
            longitude: f64::from_be_bytes(r.take()?),
            ellipsoid_height: f32::from_be_bytes(r.take()?),
            roll: f32::from_be_bytes(r.take()?),
            pitch: f32::from_be_bytes(r.take()?),
            heading: f32::from_be_bytes(r.take()?),
            heave: f32::from_be_bytes(r.take()?),
            roll_rate: f32::from_be_bytes(r.take()?),
        })
    }

    /// Decode from a hex string, e.g., datagrams relayed over a text transport. ASCII
    /// whitespace anywhere in `text` is ignored, so `"23 4b 4d 42 ..."` is accepted.
    ///
    /// # Errors
    /// [Error::Hex] if `text` is not valid hex, otherwise as [Self::decode].
    pub fn decode_hex(text: &str) -> Result<Self> {
        let digits: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        Self::decode(&hex::decode(digits)?)
    }

    /// Encode to wire format.
    #[must_use]
    pub fn encode(&self) -> [u8; Self::LEN] {
        let mut buf = [0u8; Self::LEN];
        let parts: [&[u8]; 14] = [
            &KMB_MAGIC,
            &self.length.to_be_bytes(),
            &self.version.to_be_bytes(),
            &self.utc_seconds.to_be_bytes(),
            &self.utc_nanoseconds.to_be_bytes(),
            &self.status.to_be_bytes(),
            &self.latitude.to_be_bytes(),
            &self.longitude.to_be_bytes(),
            &self.ellipsoid_height.to_be_bytes(),
            &self.roll.to_be_bytes(),
            &self.pitch.to_be_bytes(),
            &self.heading.to_be_bytes(),
            &self.heave.to_be_bytes(),
            &self.roll_rate.to_be_bytes(),
        ];
        let mut offset = 0;
        for part in parts {
            buf[offset..offset + part.len()].copy_from_slice(part);
            offset += part.len();
        }
        buf
    }

    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.encode())
    }

    /// Unix epoch seconds. Seapath time is relative to the Unix epoch.
    #[must_use]
    pub fn timestamp(&self) -> f64 {
        f64::from(self.utc_seconds) + f64::from(self.utc_nanoseconds) / 1e9
    }

    /// Payload values keyed by record field name.
    #[must_use]
    pub fn fields(&self) -> Fields {
        let mut fields = Fields::with_capacity(9);
        fields.insert("status".into(), Value::from(self.status));
        fields.insert("latitude".into(), Value::from(self.latitude));
        fields.insert("longitude".into(), Value::from(self.longitude));
        fields.insert("ellipsoid_height_m".into(), Value::from(self.ellipsoid_height));
        fields.insert("roll_deg".into(), Value::from(self.roll));
        fields.insert("pitch_deg".into(), Value::from(self.pitch));
        fields.insert("heading_deg".into(), Value::from(self.heading));
        fields.insert("heave_m".into(), Value::from(self.heave));
        fields.insert("roll_rate_deg_s".into(), Value::from(self.roll_rate));
        fields
    }

    #[must_use]
    pub fn to_record(&self, data_id: &str) -> Record {
        Record::new(data_id, self.timestamp())
            .with_message_type(KMB_MESSAGE_TYPE)
            .with_fields(self.fields())
    }
}

/// Sequential big-endian field reader over a fixed buffer.
struct Unpacker<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> Unpacker<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Unpacker { buf, offset: 0 }
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N]> {
        let end = self.offset + N;
        let dat: [u8; N] = self
            .buf
            .get(self.offset..end)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| {
                Error::DecodeFault(format!(
                    "need {N} bytes at offset {}, have {}",
                    self.offset,
                    self.buf.len()
                ))
            })?;
        self.offset = end;
        Ok(dat)
    }
}

/// [Decoder] for `#KMB` datagrams, given as bytes or as a hex string.
#[derive(Debug, Clone)]
pub struct KmbDecoder {
    data_id: String,
}

impl Default for KmbDecoder {
    fn default() -> Self {
        KmbDecoder {
            data_id: KMB_DATA_ID.to_string(),
        }
    }
}

impl KmbDecoder {
    pub fn new(data_id: impl Into<String>) -> Self {
        KmbDecoder {
            data_id: data_id.into(),
        }
    }

    #[must_use]
    pub fn data_id(&self) -> &str {
        &self.data_id
    }
}

impl Decoder for KmbDecoder {
    fn decode(&self, raw: &Raw) -> Result<Record> {
        let zult = match raw {
            Raw::Bytes(dat) => KmbDatagram::decode(dat),
            Raw::Text(text) => KmbDatagram::decode_hex(text),
        };
        match zult {
            Ok(dgm) => {
                trace!(status = dgm.status, version = dgm.version, "decoded #KMB datagram");
                Ok(dgm.to_record(&self.data_id))
            }
            Err(err @ Error::DecodeFault(_)) => {
                warn!(%err, "failed to unpack #KMB datagram");
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    fn describe(&self) -> &str {
        "#KMB datagram"
    }
}
