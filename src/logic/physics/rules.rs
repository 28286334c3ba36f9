//! Physics Rules & Bounds
//!
//! Định nghĩa các giới hạn vật lý của nguồn năng lượng.
//! KHÔNG chứa logic classify - chỉ constants và config.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_FRAUD_VOLTAGE_CEILING, DEFAULT_GENUINE_BAND_HIGH, DEFAULT_GENUINE_BAND_LOW,
};

// ============================================================================
// VOLTAGE BAND
// ============================================================================

/// Open interval (low, high) of plausible generation voltage
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoltageBand {
    pub low: f64,
    pub high: f64,
}

impl VoltageBand {
    pub fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    /// Strict on both ends
    pub fn contains(&self, voltage: f64) -> bool {
        voltage > self.low && voltage < self.high
    }
}

impl Default for VoltageBand {
    fn default() -> Self {
        Self {
            low: DEFAULT_GENUINE_BAND_LOW,
            high: DEFAULT_GENUINE_BAND_HIGH,
        }
    }
}

// ============================================================================
// CONFIGURABLE BOUNDS
// ============================================================================

/// Physical bounds of the verified source
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsBounds {
    /// Above this the reading cannot come from the cell
    pub fraud_voltage_ceiling: f64,
    /// Inside this the reading is genuine regardless of current
    pub genuine_voltage_band: VoltageBand,
}

impl Default for PhysicsBounds {
    fn default() -> Self {
        Self {
            fraud_voltage_ceiling: DEFAULT_FRAUD_VOLTAGE_CEILING,
            genuine_voltage_band: VoltageBand::default(),
        }
    }
}
