//! Synthetic Source
//!
//! Seeded generator for demos and tests. `GridSpoof` replays the fake-grid
//! reading (5 V, 200 A) the dashboard used to demonstrate fraud.

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::logic::features::Sample;
use super::{SampleSource, SourceError};

const SOLAR_VOLTAGE_MEAN: f64 = 0.8;
const SOLAR_VOLTAGE_STD: f64 = 0.05;
const SOLAR_CURRENT_MEAN: f64 = 0.02;
const SOLAR_CURRENT_STD: f64 = 0.005;

const GRID_VOLTAGE: f64 = 5.0;
const GRID_CURRENT: f64 = 200.0;

const GRAY_ZONE_VOLTAGE: f64 = 1.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyntheticProfile {
    /// Small cell in daylight
    Solar,
    /// Constant grid-powered reading
    GridSpoof,
}

pub struct SyntheticSource {
    profile: SyntheticProfile,
    rng: StdRng,
    anomaly_rate: f64,
    clock: DateTime<Utc>,
    step: Duration,
    emitted: u64,
}

impl SyntheticSource {
    pub fn new(profile: SyntheticProfile, seed: u64) -> Self {
        Self {
            profile,
            rng: StdRng::seed_from_u64(seed),
            anomaly_rate: 0.0,
            clock: Utc::now(),
            step: Duration::milliseconds(100),
            emitted: 0,
        }
    }

    /// Probability of injecting a spike or gray-zone reading, clamped to [0, 1]
    pub fn with_anomaly_rate(mut self, rate: f64) -> Self {
        self.anomaly_rate = if rate.is_finite() { rate.clamp(0.0, 1.0) } else { 0.0 };
        self
    }

    /// Fixed start time and spacing between samples
    pub fn with_clock(mut self, start: DateTime<Utc>, step: Duration) -> Self {
        self.clock = start;
        self.step = step;
        self
    }

    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    /// Box-Muller
    fn gaussian(&mut self, mean: f64, std: f64) -> f64 {
        let u1: f64 = self.rng.gen_range(f64::EPSILON..1.0);
        let u2: f64 = self.rng.gen();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std * z
    }

    fn next_reading(&mut self) -> (f64, f64) {
        if self.anomaly_rate > 0.0 && self.rng.gen_bool(self.anomaly_rate) {
            let current = self.gaussian(SOLAR_CURRENT_MEAN, SOLAR_CURRENT_STD).abs();
            return if self.rng.gen_bool(0.5) {
                (GRID_VOLTAGE, current)
            } else {
                (self.gaussian(GRAY_ZONE_VOLTAGE, SOLAR_VOLTAGE_STD), current)
            };
        }

        match self.profile {
            SyntheticProfile::Solar => (
                self.gaussian(SOLAR_VOLTAGE_MEAN, SOLAR_VOLTAGE_STD),
                self.gaussian(SOLAR_CURRENT_MEAN, SOLAR_CURRENT_STD).abs(),
            ),
            SyntheticProfile::GridSpoof => (GRID_VOLTAGE, GRID_CURRENT),
        }
    }
}

impl SampleSource for SyntheticSource {
    fn poll(&mut self) -> Result<Option<Sample>, SourceError> {
        let (voltage, current) = self.next_reading();
        let sample = Sample::new(voltage, current, self.clock);

        self.clock += self.step;
        self.emitted += 1;
        Ok(Some(sample))
    }

    fn is_simulated(&self) -> bool {
        true
    }

    fn describe(&self) -> String {
        format!("synthetic {:?} (anomaly rate {:.2})", self.profile, self.anomaly_rate)
    }
}
