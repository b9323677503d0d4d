//! Discover the `data_id` instruments actually send.
//!
//! Instruments are often registered under one name and broadcast records prefixed with
//! another. [IdScanner] listens on each instrument's UDP port for a single record and
//! takes the first word of it as the `data_id`.
//!
//! Listeners bind without `SO_REUSEADDR`, so a port already held by a running logger
//! cannot be probed. Such targets are logged at `WARN` and left out of the results; stop
//! the logger before scanning.
use std::collections::{BTreeMap, HashMap};
use std::io::ErrorKind;
use std::net::{IpAddr, Ipv4Addr, UdpSocket};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use regex::Regex;
use threadpool::ThreadPool;
use tracing::{debug, info, warn};

use crate::prelude::*;

/// Largest record read while probing.
const MAX_RECORD_LEN: usize = 4096;

/// An instrument to probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanTarget {
    /// Id the instrument is known by, used as the key of the scan results
    pub sensor_id: String,
    pub port: u16,
}

impl ScanTarget {
    pub fn new(sensor_id: impl Into<String>, port: u16) -> Self {
        ScanTarget {
            sensor_id: sensor_id.into(),
            port,
        }
    }
}

/// First word of a text record, ignoring leading whitespace.
#[must_use]
pub fn leading_data_id(record: &str) -> Option<&str> {
    static DATA_ID: OnceLock<Regex> = OnceLock::new();
    let re = DATA_ID.get_or_init(|| Regex::new(r"^\s*(\w+)").expect("data id pattern is valid"));
    re.captures(record)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Probes many UDP ports in parallel, each for at most a fixed timeout.
#[derive(Debug, Clone)]
pub struct IdScanner {
    bind_addr: IpAddr,
    timeout: Duration,
}

impl Default for IdScanner {
    fn default() -> Self {
        IdScanner {
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }
}

impl IdScanner {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

    /// Address listeners bind to. Defaults to all interfaces.
    #[must_use]
    pub fn with_bind_addr(mut self, addr: IpAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// How long each listener waits for a record. Defaults to [Self::DEFAULT_TIMEOUT].
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Listen on every target port at once and return `sensor_id -> data_id` for each
    /// target that sent a record with a recognizable `data_id`, sorted by `sensor_id`.
    ///
    /// Targets that are silent for the whole timeout, or whose port cannot be bound, are
    /// left out.
    pub fn scan(&self, targets: &[ScanTarget]) -> BTreeMap<String, String> {
        if targets.is_empty() {
            return BTreeMap::new();
        }
        info!(count = targets.len(), "scanning for active UDP streams");

        let pool = ThreadPool::with_name("id-scan".into(), targets.len());
        let mapping: Arc<Mutex<HashMap<String, String>>> = Arc::default();

        for target in targets {
            let target = target.clone();
            let mapping = Arc::clone(&mapping);
            let addr = self.bind_addr;
            let timeout = self.timeout;
            pool.execute(move || match probe(addr, target.port, timeout) {
                Ok(Some(data_id)) => {
                    debug!(sensor_id = target.sensor_id, data_id, "found data id");
                    if let Ok(mut mapping) = mapping.lock() {
                        mapping.insert(target.sensor_id, data_id);
                    }
                }
                Ok(None) => {
                    debug!(sensor_id = target.sensor_id, port = target.port, "no data id");
                }
                Err(err) => {
                    warn!(sensor_id = target.sensor_id, port = target.port, %err, "probe failed");
                }
            });
        }
        pool.join();

        let found: BTreeMap<String, String> = match mapping.lock() {
            Ok(mapping) => mapping.clone().into_iter().collect(),
            Err(poisoned) => poisoned.into_inner().clone().into_iter().collect(),
        };
        info!(found = found.len(), "probe complete");
        found
    }
}

/// Wait for one record on `port`. `Ok(None)` if nothing arrived in time or the record had
/// no data id.
fn probe(addr: IpAddr, port: u16, timeout: Duration) -> Result<Option<String>> {
    let sock = UdpSocket::bind((addr, port))?;
    sock.set_read_timeout(Some(timeout))?;

    let mut buf = [0u8; MAX_RECORD_LEN];
    let len = match sock.recv_from(&mut buf) {
        Ok((len, _)) => len,
        Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
            return Ok(None)
        }
        Err(err) => return Err(err.into()),
    };

    let record = String::from_utf8_lossy(&buf[..len]);
    Ok(leading_data_id(record.trim()).map(String::from))
}
