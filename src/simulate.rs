//! Synthetic `#KMB` motion data.
//!
//! Produces a vessel slowly drifting north-east while turning to starboard, with sinusoidal
//! roll, pitch, and heave. Samples are a pure function of their index so a feed can be
//! reproduced exactly.
use crate::kmb::KmbDatagram;
use crate::prelude::*;

/// Iterator of simulated datagrams at a fixed rate starting at a fixed time.
///
/// # Example
/// ```
/// use rvdecode::simulate::Simulator;
/// use rvdecode::kmb::KmbDatagram;
///
/// let sim = Simulator::new(1_704_067_200.0, 20.0).unwrap();
/// for hex in sim.take(3).map(|dgm| dgm.to_hex()) {
///     assert!(KmbDatagram::decode_hex(&hex).is_ok());
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Simulator {
    start: f64,
    rate_hz: f64,
    index: u32,
}

impl Simulator {
    /// # Errors
    /// [Error::Config] if `rate_hz` is not a positive number or `start` is before the
    /// Unix epoch.
    pub fn new(start: f64, rate_hz: f64) -> Result<Self> {
        if !(rate_hz.is_finite() && rate_hz > 0.0) {
            return Err(Error::Config(format!(
                "simulation rate must be positive, got {rate_hz}"
            )));
        }
        if !(start.is_finite() && start >= 0.0) {
            return Err(Error::Config(format!(
                "simulation start must be a Unix time, got {start}"
            )));
        }
        Ok(Simulator {
            start,
            rate_hz,
            index: 0,
        })
    }

    /// Datagram for sample number `i`.
    #[must_use]
    pub fn sample(&self, i: u32) -> KmbDatagram {
        let t = self.start + f64::from(i) / self.rate_hz;
        let utc_seconds = t.floor();
        let utc_nanoseconds = (((t - utc_seconds) * 1e9) as u32).min(999_999_999);

        let x = f64::from(i);
        let heave = (x * 0.1).sin();

        KmbDatagram {
            length: KmbDatagram::LEN as u16,
            version: 1,
            utc_seconds: utc_seconds as u32,
            utc_nanoseconds,
            status: 0,
            latitude: 45.0 + x * 0.00001,
            longitude: -125.0 + x * 0.00001,
            ellipsoid_height: (10.0 + heave) as f32,
            roll: (5.0 * (x * 0.05).sin()) as f32,
            pitch: (2.0 * (x * 0.05).cos()) as f32,
            heading: ((180.0 + x * 0.1) % 360.0) as f32,
            heave: heave as f32,
            roll_rate: (0.5 * (x * 0.05).cos()) as f32,
        }
    }
}

impl Iterator for Simulator {
    type Item = KmbDatagram;

    fn next(&mut self) -> Option<Self::Item> {
        let dgm = self.sample(self.index);
        self.index = self.index.checked_add(1)?;
        Some(dgm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_are_spaced_by_rate() {
        let dgms: Vec<KmbDatagram> = Simulator::new(100.0, 4.0).unwrap().take(5).collect();
        let expected = [100.0, 100.25, 100.5, 100.75, 101.0];
        for (dgm, want) in dgms.iter().zip(expected) {
            assert!((dgm.timestamp() - want).abs() < 1e-6, "{dgm:?}");
        }
        assert!(dgms.iter().all(|d| d.length == 60 && d.version == 1));
    }

    #[test]
    fn motion_is_bounded() {
        for dgm in Simulator::new(0.0, 20.0).unwrap().take(2000) {
            assert!(dgm.roll.abs() <= 5.0);
            assert!(dgm.pitch.abs() <= 2.0);
            assert!(dgm.heave.abs() <= 1.0);
            assert!((0.0..=360.0).contains(&dgm.heading));
            assert!(dgm.utc_nanoseconds < 1_000_000_000);
        }
    }

    #[test]
    fn sample_is_reproducible() {
        let sim = Simulator::new(1_704_067_200.0, 20.0).unwrap();
        let from_iter = sim.clone().nth(42).unwrap();
        assert_eq!(from_iter, sim.sample(42));
        assert_eq!(
            KmbDatagram::decode(&from_iter.encode()).unwrap(),
            sim.sample(42)
        );
    }

    #[test]
    fn invalid_rate() {
        assert!(matches!(Simulator::new(0.0, 0.0), Err(Error::Config(_))));
        assert!(matches!(Simulator::new(0.0, -1.0), Err(Error::Config(_))));
        assert!(matches!(Simulator::new(-5.0, 1.0), Err(Error::Config(_))));
    }
}
