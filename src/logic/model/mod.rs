//! Model Module - Statistical Outlier Detection
//!
//! Tách logic scoring khỏi data collection.
//! Dễ dàng swap model qua trait `AnomalyModel`.
//!
//! ## Structure
//! - `standardize` - Per-feature mean/std scaling
//! - `forest` - Isolation forest ensemble
//! - `threshold` - Contamination-derived decision cut
//! - `detector` - Fit/score lifecycle over a FeatureWindow
//! - `storage` - Versioned detector snapshots

pub mod standardize;
pub mod threshold;
pub mod forest;
pub mod detector;
pub mod storage;

use crate::logic::features::FeatureRow;

pub use standardize::StandardizationParams;
pub use threshold::{ContaminationThreshold, ThresholdStats};
pub use forest::{IsolationForest, ForestConfig};
pub use detector::{DetectorDecision, FitReport, StatisticalDetector};
pub use storage::{DetectorSnapshot, SnapshotError};

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DetectorError {
    #[error("insufficient calibration data: have {have} samples, need {need}")]
    InsufficientData { have: usize, need: usize },

    #[error("detector scored before being fitted")]
    NotTrained,
}

// ============================================================================
// MODEL TRAIT
// ============================================================================

/// Trait cho unsupervised outlier models (forest, statistical, ...)
pub trait AnomalyModel {
    /// Fit on standardized rows, replacing any previous fit
    fn fit(&mut self, data: &[FeatureRow]) -> Result<(), DetectorError>;

    /// Anomaly score, higher = more anomalous
    fn score(&self, sample: &FeatureRow) -> Result<f64, DetectorError>;

    /// True if the row is an outlier under the fitted threshold
    fn predict(&self, sample: &FeatureRow) -> Result<bool, DetectorError>;

    /// Current decision threshold on the score scale
    fn threshold(&self) -> Option<f64>;

    fn name(&self) -> &str;

    fn is_trained(&self) -> bool;
}
