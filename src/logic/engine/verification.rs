//! Verification Engine
//!
//! Owns the window, physics rules and detector for one session.
//! Pipeline mỗi sample:
//!   push window → (calibrate once) → physics → detector fallback → reward
//!
//! `ingest` là total: không I/O, không panic, luôn trả về Verdict.

use crate::logic::config::{ConfigError, VerifierConfig};
use crate::logic::features::layout::{layout_hash, FEATURE_COUNT, FEATURE_VERSION};
use crate::logic::features::{FeatureWindow, Sample};
use crate::logic::model::{
    AnomalyModel, DetectorDecision, DetectorError, DetectorSnapshot, FitReport, ForestConfig,
    SnapshotError, StatisticalDetector,
};
use crate::logic::physics::{PhysicsClass, PhysicsRuleEngine};

use super::status::{EngineStatus, ModelStatus, VerdictCounters};
use super::types::{Assessment, DecisionStage, EngineState, Verdict};

/// Reward for an authentic sample. Zero unless power exceeds the idle floor.
pub fn reward_increment(power: f64, idle_power_floor: f64, rate: f64) -> f64 {
    if power.is_finite() && power > idle_power_floor {
        power * rate
    } else {
        0.0
    }
}

/// Forest settings in which a trained model differs from `config`
pub(super) fn tuning_drift(config: &VerifierConfig, forest: &ForestConfig) -> Vec<&'static str> {
    let mut drift = Vec::new();
    if forest.contamination != config.contamination_rate {
        drift.push("contamination");
    }
    if forest.seed != config.detector.seed {
        drift.push("seed");
    }
    if forest.n_estimators != config.detector.n_estimators {
        drift.push("n_estimators");
    }
    if forest.max_samples != config.detector.max_samples {
        drift.push("max_samples");
    }
    drift
}

pub struct VerificationEngine {
    config: VerifierConfig,
    physics: PhysicsRuleEngine,
    detector: StatisticalDetector,
    window: FeatureWindow,
    state: EngineState,
    counters: VerdictCounters,
    total_reward_issued: f64,
}

impl VerificationEngine {
    /// Validate config and start in CALIBRATING
    pub fn new(config: VerifierConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            physics: PhysicsRuleEngine::new(config.physics),
            detector: StatisticalDetector::from_config(&config),
            window: FeatureWindow::new(config.window_capacity),
            state: EngineState::Calibrating,
            counters: VerdictCounters::default(),
            total_reward_issued: 0.0,
            config,
        })
    }

    // ========================================================================
    // INGEST
    // ========================================================================

    pub fn ingest(&mut self, sample: Sample) -> Verdict {
        self.assess(sample).verdict
    }

    /// Ingest one sample and report how the verdict was reached
    pub fn assess(&mut self, sample: Sample) -> Assessment {
        self.window.push(sample);

        let calibrated_now = self.try_calibrate();

        let explained = self.physics.explain(&sample);
        let physics = explained.class;
        let (verdict, stage, detector) = match physics {
            PhysicsClass::DefinitelyFraud => {
                log::warn!("Fraud: {}", explained.reason);
                (Verdict::Anomalous, DecisionStage::PhysicsRule, None)
            }
            PhysicsClass::DefinitelyGenuine => (Verdict::Authentic, DecisionStage::PhysicsRule, None),
            PhysicsClass::Inconclusive => self.consult_detector(&sample),
        };

        let reward = if verdict == Verdict::Authentic {
            reward_increment(
                sample.power(),
                self.config.idle_power_floor,
                self.config.reward_rate_per_power_unit,
            )
        } else {
            0.0
        };

        self.counters.record(verdict);
        self.total_reward_issued += reward;

        Assessment {
            sample,
            verdict,
            stage,
            physics,
            reason: explained.reason,
            detector,
            reward_increment: reward,
            calibrated_now,
        }
    }

    fn try_calibrate(&mut self) -> bool {
        if self.state != EngineState::Calibrating
            || self.window.len() < self.config.min_training_window
        {
            return false;
        }

        match self.fit_plausible() {
            Ok(report) => {
                self.state = EngineState::Ready;
                log::info!(
                    "Calibration complete: {} samples, threshold {:.4}",
                    report.samples,
                    report.threshold
                );
                true
            }
            Err(e) => {
                log::debug!("Calibration deferred: {}", e);
                false
            }
        }
    }

    /// Fit on the window, leaving out readings above the fraud ceiling
    fn fit_plausible(&mut self) -> Result<FitReport, DetectorError> {
        let physics = self.physics;
        self.detector
            .fit_where(&self.window, |s| physics.classify(s) != PhysicsClass::DefinitelyFraud)
    }

    fn consult_detector(
        &self,
        sample: &Sample,
    ) -> (Verdict, DecisionStage, Option<DetectorDecision>) {
        if self.state == EngineState::Calibrating {
            return (Verdict::Uncertain, DecisionStage::Calibrating, None);
        }

        match self.detector.score(sample) {
            Ok(decision) => (decision.verdict, DecisionStage::Detector, Some(decision)),
            Err(e) => {
                log::error!("Detector unavailable in READY state: {}", e);
                (Verdict::Uncertain, DecisionStage::Calibrating, None)
            }
        }
    }

    // ========================================================================
    // TRAINING CONTROL
    // ========================================================================

    /// Explicit refit on the current window. Too few samples → error, state
    /// unchanged.
    pub fn retrain(&mut self) -> Result<FitReport, DetectorError> {
        let report = self.fit_plausible()?;
        self.state = EngineState::Ready;
        log::info!(
            "Detector retrained on {} samples (training #{})",
            report.samples,
            self.detector.trainings()
        );
        Ok(report)
    }

    /// Install a persisted detector and skip calibration
    pub fn restore(&mut self, snapshot: DetectorSnapshot) -> Result<(), SnapshotError> {
        snapshot.validate()?;

        let DetectorSnapshot {
            params,
            forest,
            training_samples,
            trained_at,
            ..
        } = snapshot;

        let drift = tuning_drift(&self.config, forest.config());
        if !drift.is_empty() {
            log::warn!(
                "Restored detector was trained with different settings ({}); keeping the snapshot",
                drift.join(", ")
            );
        }

        self.detector.install(forest, params, trained_at, training_samples);
        self.state = EngineState::Ready;
        log::info!(
            "Detector restored (trained {} on {} samples)",
            trained_at.format("%Y-%m-%d %H:%M:%S"),
            training_samples
        );
        Ok(())
    }

    pub fn snapshot(&self) -> Result<DetectorSnapshot, SnapshotError> {
        DetectorSnapshot::capture(&self.detector)
    }

    // ========================================================================
    // READ ACCESS
    // ========================================================================

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn window(&self) -> &FeatureWindow {
        &self.window
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    pub fn detector(&self) -> &StatisticalDetector {
        &self.detector
    }

    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            feature_version: FEATURE_VERSION,
            layout_hash: layout_hash(),
            feature_count: FEATURE_COUNT,
            state: self.state,
            window: self.window.status(self.config.min_training_window),
            model: ModelStatus {
                engine: self.detector.model().name().to_string(),
                trained: self.detector.is_trained(),
                trained_at: self.detector.trained_at(),
                trained_on_samples: self.detector.training_samples(),
                trainings: self.detector.trainings(),
                threshold: self.detector.model().threshold_stats(),
            },
            verdicts: self.counters.clone(),
            total_reward_issued: self.total_reward_issued,
        }
    }
}
