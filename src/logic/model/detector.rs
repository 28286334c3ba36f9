//! Statistical Outlier Detector
//!
//! Fit/score lifecycle over a FeatureWindow:
//! standardize → fit ensemble → threshold from contamination.
//! A new fit fully replaces params and model (no blending).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::logic::config::VerifierConfig;
use crate::logic::engine::Verdict;
use crate::logic::features::{FeatureWindow, Sample};
use super::forest::{ForestConfig, IsolationForest};
use super::standardize::StandardizationParams;
use super::{AnomalyModel, DetectorError};

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// Detector output for one sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorDecision {
    /// Authentic or Anomalous, never Uncertain
    pub verdict: Verdict,
    pub anomaly_score: f64,
    pub threshold: f64,
}

/// Summary of one training event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitReport {
    pub samples: usize,
    pub params: StandardizationParams,
    pub threshold: f64,
    pub trained_at: DateTime<Utc>,
}

// ============================================================================
// DETECTOR
// ============================================================================

#[derive(Debug, Clone)]
pub struct StatisticalDetector<M: AnomalyModel = IsolationForest> {
    model: M,
    params: Option<StandardizationParams>,
    min_training_window: usize,
    std_epsilon: f64,
    trained_at: Option<DateTime<Utc>>,
    training_samples: usize,
    trainings: u64,
}

impl StatisticalDetector<IsolationForest> {
    /// Isolation forest detector configured from the verifier config
    pub fn from_config(config: &VerifierConfig) -> Self {
        let forest = IsolationForest::new(ForestConfig {
            n_estimators: config.detector.n_estimators,
            max_samples: config.detector.max_samples,
            contamination: config.contamination_rate,
            seed: config.detector.seed,
        });

        Self::with_model(forest, config.min_training_window, config.detector.std_epsilon)
    }
}

impl<M: AnomalyModel> StatisticalDetector<M> {
    pub fn with_model(model: M, min_training_window: usize, std_epsilon: f64) -> Self {
        Self {
            model,
            params: None,
            min_training_window,
            std_epsilon,
            trained_at: None,
            training_samples: 0,
            trainings: 0,
        }
    }

    /// Fit on the whole window. Fewer than `min_training_window` samples
    /// leaves the detector untouched.
    pub fn fit(&mut self, window: &FeatureWindow) -> Result<FitReport, DetectorError> {
        self.fit_where(window, |_| true)
    }

    /// Fit on the window samples accepted by `keep`. The window itself must
    /// hold `min_training_window` samples; rows with non-finite features are
    /// never trained on.
    pub fn fit_where<F>(&mut self, window: &FeatureWindow, keep: F) -> Result<FitReport, DetectorError>
    where
        F: Fn(&Sample) -> bool,
    {
        let have = window.len();
        if have < self.min_training_window {
            return Err(DetectorError::InsufficientData {
                have,
                need: self.min_training_window,
            });
        }

        let rows: Vec<_> = window
            .iter()
            .filter(|s| keep(*s))
            .map(|s| s.features())
            .filter(|r| r.iter().all(|v| v.is_finite()))
            .collect();
        if rows.len() < 2 {
            return Err(DetectorError::InsufficientData { have: rows.len(), need: 2 });
        }
        if rows.len() < have {
            log::debug!("{} of {} window samples excluded from training", have - rows.len(), have);
        }

        let params = StandardizationParams::fit(&rows, self.std_epsilon);
        let standardized = params.transform_all(&rows);

        self.model.fit(&standardized)?;

        let trained_at = window.latest().map(|s| s.timestamp()).unwrap_or_else(Utc::now);
        let threshold = self.model.threshold().unwrap_or(f64::NAN);
        let samples = rows.len();

        self.params = Some(params.clone());
        self.trained_at = Some(trained_at);
        self.training_samples = samples;
        self.trainings += 1;

        log::debug!(
            "{} fitted on {} samples (threshold {:.4}, mean {:?}, std {:?})",
            self.model.name(), samples, threshold, params.mean, params.std
        );

        Ok(FitReport {
            samples,
            params,
            threshold,
            trained_at,
        })
    }

    /// Score one sample. Calling this before `fit` is a contract violation.
    pub fn score(&self, sample: &Sample) -> Result<DetectorDecision, DetectorError> {
        let params = self.params.as_ref().ok_or(DetectorError::NotTrained)?;
        if !self.model.is_trained() {
            return Err(DetectorError::NotTrained);
        }

        let z = params.transform(&sample.features());
        let anomaly_score = self.model.score(&z)?;
        let is_outlier = self.model.predict(&z)?;

        Ok(DetectorDecision {
            verdict: if is_outlier { Verdict::Anomalous } else { Verdict::Authentic },
            anomaly_score,
            threshold: self.model.threshold().unwrap_or(f64::NAN),
        })
    }

    pub fn is_trained(&self) -> bool {
        self.params.is_some() && self.model.is_trained()
    }

    pub fn params(&self) -> Option<&StandardizationParams> {
        self.params.as_ref()
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn min_training_window(&self) -> usize {
        self.min_training_window
    }

    pub fn trained_at(&self) -> Option<DateTime<Utc>> {
        self.trained_at
    }

    pub fn training_samples(&self) -> usize {
        self.training_samples
    }

    pub fn trainings(&self) -> u64 {
        self.trainings
    }

    /// Install an already-fitted model (snapshot restore)
    pub(crate) fn install(
        &mut self,
        model: M,
        params: StandardizationParams,
        trained_at: DateTime<Utc>,
        training_samples: usize,
    ) {
        self.model = model;
        self.params = Some(params);
        self.trained_at = Some(trained_at);
        self.training_samples = training_samples;
        self.trainings += 1;
    }
}

// ============================================================================
// TESTS
// ============================================================================
