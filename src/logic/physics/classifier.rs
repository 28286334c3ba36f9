//! Physics Classifier
//!
//! CHỈ chứa logic classify - pure function of one Sample.
//! Rules are evaluated in fixed priority order, first match wins:
//! 1. voltage > ceiling         → DefinitelyFraud
//! 2. low < voltage < high      → DefinitelyGenuine (current ignored)
//! 3. otherwise                 → Inconclusive

use crate::logic::features::Sample;
use super::rules::PhysicsBounds;
use super::types::{PhysicsClass, PhysicsResult};

/// Stateless plausibility classifier
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PhysicsRuleEngine {
    bounds: PhysicsBounds,
}

impl PhysicsRuleEngine {
    pub fn new(bounds: PhysicsBounds) -> Self {
        Self { bounds }
    }

    pub fn classify(&self, sample: &Sample) -> PhysicsClass {
        classify_voltage(sample.voltage(), &self.bounds)
    }

    /// Classification with a human-readable reason
    pub fn explain(&self, sample: &Sample) -> PhysicsResult {
        let voltage = sample.voltage();
        let class = classify_voltage(voltage, &self.bounds);
        let band = self.bounds.genuine_voltage_band;

        let reason = match class {
            PhysicsClass::DefinitelyFraud => format!(
                "{:.3} V exceeds the {:.3} V open-circuit ceiling",
                voltage, self.bounds.fraud_voltage_ceiling
            ),
            PhysicsClass::DefinitelyGenuine => format!(
                "{:.3} V inside generation band ({:.3}, {:.3})",
                voltage, band.low, band.high
            ),
            PhysicsClass::Inconclusive => format!(
                "{:.3} V outside generation band, below ceiling",
                voltage
            ),
        };

        PhysicsResult { class, voltage, reason }
    }
}

/// Core rule evaluation
pub fn classify_voltage(voltage: f64, bounds: &PhysicsBounds) -> PhysicsClass {
    if voltage > bounds.fraud_voltage_ceiling {
        PhysicsClass::DefinitelyFraud
    } else if bounds.genuine_voltage_band.contains(voltage) {
        PhysicsClass::DefinitelyGenuine
    } else {
        PhysicsClass::Inconclusive
    }
}

// ============================================================================
// TESTS
// ============================================================================
