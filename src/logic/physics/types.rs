//! Physics Types
//!
//! KHÔNG chứa logic - chỉ data structures.

use serde::{Deserialize, Serialize};

/// Outcome of the physical plausibility check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhysicsClass {
    /// Voltage a single cell cannot produce
    DefinitelyFraud,
    /// Voltage inside the generation band, current ignored
    DefinitelyGenuine,
    /// Gray zone: defer to the statistical detector
    Inconclusive,
}

impl PhysicsClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhysicsClass::DefinitelyFraud => "definitely_fraud",
            PhysicsClass::DefinitelyGenuine => "definitely_genuine",
            PhysicsClass::Inconclusive => "inconclusive",
        }
    }

}

impl std::fmt::Display for PhysicsClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Classification with explanation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicsResult {
    pub class: PhysicsClass,
    pub voltage: f64,
    pub reason: String,
}
