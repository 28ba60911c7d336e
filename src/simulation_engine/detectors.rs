use crate::error::DetectorError;
use log::warn;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// A presence sensor bound to a traffic stream.
///
/// `sense` is called from the tick thread once per tick and must not block.
/// Real sensors are expected to sample into a cached value elsewhere (see
/// [`LatchedDetector`]).
pub trait Detector: Send + Sync {
    fn sense(&self) -> Result<bool, DetectorError>;
}

/// Shared, non-owning handle to a detector. Streams and phases hold these.
pub type DetectorHandle = Arc<dyn Detector>;

/// Reads a detector. A failed read is logged and counts as "no vehicle
/// present", so a broken sensor cannot hold a phase green.
pub fn read_presence(detector: &dyn Detector) -> bool {
    match detector.sense() {
        Ok(present) => present,
        Err(e) => {
            warn!("Detector read failed, treating as no presence: {}", e);
            false
        }
    }
}

/// Reports presence with a fixed probability on every read.
pub struct RandomDetector {
    probability: f64,
    rng: Mutex<SmallRng>,
}

impl RandomDetector {
    pub fn new(probability: f64) -> Self {
        Self::seeded(probability, rand::random())
    }

    /// Deterministic variant for reproducible runs.
    pub fn seeded(probability: f64, seed: u64) -> Self {
        Self {
            probability: if probability.is_nan() {
                0.0
            } else {
                probability.clamp(0.0, 1.0)
            },
            rng: Mutex::new(SmallRng::seed_from_u64(seed)),
        }
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }
}

impl Detector for RandomDetector {
    fn sense(&self) -> Result<bool, DetectorError> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| DetectorError::Unavailable("random source poisoned".to_string()))?;
        Ok(rng.random_bool(self.probability))
    }
}

/// Replays a pre-recorded sequence of readings, one per call.
/// Once the script runs out every read fails with [`DetectorError::Exhausted`].
pub struct ScriptedDetector {
    readings: Mutex<VecDeque<bool>>,
}

impl ScriptedDetector {
    pub fn new(readings: impl IntoIterator<Item = bool>) -> Self {
        Self {
            readings: Mutex::new(readings.into_iter().collect()),
        }
    }

    /// Number of readings not yet consumed.
    pub fn remaining(&self) -> usize {
        self.readings.lock().map(|r| r.len()).unwrap_or(0)
    }
}

impl Detector for ScriptedDetector {
    fn sense(&self) -> Result<bool, DetectorError> {
        let mut readings = self
            .readings
            .lock()
            .map_err(|_| DetectorError::Unavailable("script poisoned".to_string()))?;
        readings.pop_front().ok_or(DetectorError::Exhausted)
    }
}

/// Holds the last value pushed by an external sampler.
///
/// A hardware adapter running on its own task calls [`LatchedDetector::set`];
/// the tick thread only ever reads the cached flag.
#[derive(Default)]
pub struct LatchedDetector {
    present: AtomicBool,
}

impl LatchedDetector {
    pub fn new(present: bool) -> Self {
        Self {
            present: AtomicBool::new(present),
        }
    }

    pub fn set(&self, present: bool) {
        self.present.store(present, Ordering::Release);
    }
}

impl Detector for LatchedDetector {
    fn sense(&self) -> Result<bool, DetectorError> {
        Ok(self.present.load(Ordering::Acquire))
    }
}
