/// Synthetic sensor readings.
///
/// Stands in for real field sensors: uniform random values in the ranges
/// the demo hardware reports, rounded to one decimal place, tagged with a
/// random disaster type.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::ingest::ReadingSource;
use crate::model::{Reading, DISASTER_TYPES};

pub const TEMPERATURE_RANGE_C: (f64, f64) = (20.0, 40.0);
pub const HUMIDITY_RANGE_PCT: (f64, f64) = (40.0, 90.0);
pub const PRESSURE_RANGE_HPA: (f64, f64) = (1005.0, 1020.0);

pub struct SyntheticSource {
    rng: StdRng,
}

impl SyntheticSource {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible stream, for tests and demos.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn generate(&mut self) -> Reading {
        let temperature = round1(self.rng.gen_range(TEMPERATURE_RANGE_C.0..=TEMPERATURE_RANGE_C.1));
        let humidity = round1(self.rng.gen_range(HUMIDITY_RANGE_PCT.0..=HUMIDITY_RANGE_PCT.1));
        let pressure = round1(self.rng.gen_range(PRESSURE_RANGE_HPA.0..=PRESSURE_RANGE_HPA.1));
        let disaster_type = DISASTER_TYPES
            .choose(&mut self.rng)
            .map(|s| s.to_string());

        Reading {
            temperature,
            humidity,
            pressure,
            disaster_type,
        }
    }

    pub fn generate_many(&mut self, count: usize) -> Vec<Reading> {
        (0..count).map(|_| self.generate()).collect()
    }
}

impl Default for SyntheticSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadingSource for SyntheticSource {
    fn next_reading(&mut self) -> Option<Reading> {
        Some(self.generate())
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
