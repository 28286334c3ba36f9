//! Engine Types
//!
//! Core types cho verification output.
//! KHÔNG chứa logic - chỉ data structures.

use serde::{Deserialize, Serialize};

use crate::logic::features::Sample;
use crate::logic::model::DetectorDecision;
use crate::logic::physics::PhysicsClass;

// ============================================================================
// VERDICT
// ============================================================================

/// Per-sample classification output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    /// Genuine green generation
    Authentic,
    /// Fraud or statistical outlier
    Anomalous,
    /// Gray zone while the detector is still calibrating
    Uncertain,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Authentic => "authentic",
            Verdict::Anomalous => "anomalous",
            Verdict::Uncertain => "uncertain",
        }
    }

    pub fn is_anomalous(&self) -> bool {
        matches!(self, Verdict::Anomalous)
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// LIFECYCLE
// ============================================================================

/// CALIBRATING → READY, one-way
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineState {
    Calibrating,
    Ready,
}

impl EngineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineState::Calibrating => "calibrating",
            EngineState::Ready => "ready",
        }
    }
}

/// Which stage produced the verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecisionStage {
    PhysicsRule,
    Detector,
    Calibrating,
}

// ============================================================================
// ASSESSMENT
// ============================================================================

/// Full result of one ingest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub sample: Sample,
    pub verdict: Verdict,
    pub stage: DecisionStage,
    pub physics: PhysicsClass,
    /// Physics explanation for the reading
    pub reason: String,
    /// Present only when the detector was consulted
    pub detector: Option<DetectorDecision>,
    /// Reward to request from the ledger (0 if not eligible)
    pub reward_increment: f64,
    /// True on the ingest that completed calibration
    pub calibrated_now: bool,
}
