//! Contamination Threshold
//!
//! Quản lý ngưỡng phát hiện outlier.
//! The cut is the `(1 - contamination)` quantile of the training scores,
//! so roughly `contamination` of the calibration window sits above it.

use serde::{Deserialize, Serialize};

/// Decision threshold derived at fit time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContaminationThreshold {
    /// Expected outlier proportion used to place the cut
    contamination: f64,
    /// Score above which a row is an outlier
    value: f64,
    mean_score: f64,
    max_score: f64,
    sample_count: usize,
}

impl ContaminationThreshold {
    /// Build from training scores (higher = more anomalous)
    pub fn from_scores(scores: &[f64], contamination: f64) -> Self {
        let n = scores.len();
        if n == 0 {
            return Self {
                contamination,
                value: 1.0,
                mean_score: 0.0,
                max_score: 0.0,
                sample_count: 0,
            };
        }

        let mut sorted = scores.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let mean = sorted.iter().sum::<f64>() / n as f64;

        Self {
            contamination,
            value: quantile(&sorted, 1.0 - contamination),
            mean_score: mean,
            max_score: sorted[n - 1],
            sample_count: n,
        }
    }

    pub fn get(&self) -> f64 {
        self.value
    }

    pub fn contamination(&self) -> f64 {
        self.contamination
    }

    /// Strictly above the cut
    pub fn is_outlier(&self, score: f64) -> bool {
        score > self.value
    }

    pub fn stats(&self) -> ThresholdStats {
        ThresholdStats {
            current: self.value,
            contamination: self.contamination,
            mean_score: self.mean_score,
            max_score: self.max_score,
            sample_count: self.sample_count,
        }
    }
}

/// Linear-interpolated quantile of an ascending slice
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }

    let pos = q.clamp(0.0, 1.0) * (n - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;

    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Threshold statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdStats {
    pub current: f64,
    pub contamination: f64,
    pub mean_score: f64,
    pub max_score: f64,
    pub sample_count: usize,
}
