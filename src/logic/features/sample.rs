//! Sample - one (V, I, P) reading
//!
//! Giá trị bất biến: power luôn được tính lại từ voltage * current,
//! không tin giá trị power gửi từ sensor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::layout::FeatureRow;

/// Immutable electrical reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    voltage: f64,
    current: f64,
    power: f64,
    timestamp: DateTime<Utc>,
}

impl Sample {
    /// Build a sample, clamping negative and non-finite inputs to zero.
    pub fn new(voltage: f64, current: f64, timestamp: DateTime<Utc>) -> Self {
        let voltage = clamp_reading(voltage);
        let current = clamp_reading(current);

        Self {
            voltage,
            current,
            power: voltage * current,
            timestamp,
        }
    }

    /// Build a sample stamped with the current time
    pub fn now(voltage: f64, current: f64) -> Self {
        Self::new(voltage, current, Utc::now())
    }

    pub fn voltage(&self) -> f64 {
        self.voltage
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn power(&self) -> f64 {
        self.power
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Feature row in layout order
    pub fn features(&self) -> FeatureRow {
        [self.voltage, self.current, self.power]
    }
}

fn clamp_reading(value: f64) -> f64 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}
