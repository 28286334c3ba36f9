//! Standardization Parameters
//!
//! `(x - mean) / std` per feature. Std is floored so a constant
//! feature never divides by zero.

use serde::{Deserialize, Serialize};

use crate::logic::features::{FeatureRow, FEATURE_COUNT};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardizationParams {
    pub mean: FeatureRow,
    pub std: FeatureRow,
}

impl Default for StandardizationParams {
    fn default() -> Self {
        Self {
            mean: [0.0; FEATURE_COUNT],
            std: [1.0; FEATURE_COUNT],
        }
    }
}

impl StandardizationParams {
    /// Population mean/std over `rows`, std floored at `epsilon`.
    /// Non-finite values are skipped per feature.
    pub fn fit(rows: &[FeatureRow], epsilon: f64) -> Self {
        let mut params = Self::default();

        for i in 0..FEATURE_COUNT {
            let values: Vec<f64> = rows.iter().map(|r| r[i]).filter(|v| v.is_finite()).collect();
            let (mean, std) = column_stats(&values);
            params.mean[i] = mean;
            params.std[i] = std.max(epsilon);
        }

        params
    }

    pub fn transform(&self, row: &FeatureRow) -> FeatureRow {
        let mut out = [0.0; FEATURE_COUNT];
        for i in 0..FEATURE_COUNT {
            out[i] = (row[i] - self.mean[i]) / self.std[i];
        }
        out
    }

    pub fn transform_all(&self, rows: &[FeatureRow]) -> Vec<FeatureRow> {
        rows.iter().map(|r| self.transform(r)).collect()
    }
}

/// Mean and population std of one feature. Values are scaled by their
/// largest magnitude first so squaring cannot overflow. Empty or
/// non-finite results fall back to (0, 1).
fn column_stats(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 1.0);
    }

    let scale = values.iter().fold(0.0f64, |m, v| m.max(v.abs()));
    if scale == 0.0 {
        return (0.0, 0.0);
    }

    let n = values.len() as f64;
    let mean_scaled = values.iter().map(|v| v / scale).sum::<f64>() / n;
    let var_scaled = values
        .iter()
        .map(|v| (v / scale - mean_scaled).powi(2))
        .sum::<f64>()
        / n;

    let mean = mean_scaled * scale;
    let std = var_scaled.sqrt() * scale;
    if mean.is_finite() && std.is_finite() {
        (mean, std)
    } else {
        (0.0, 1.0)
    }
}
