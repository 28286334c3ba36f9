//! Detector Snapshot Storage
//!
//! Persist a trained detector as versioned JSON so a restarted session can
//! skip calibration. Layout version/hash mismatch → reject, recalibrate.

use std::fs;
use std::path::{Path, PathBuf};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::get_data_dir;
use crate::logic::features::layout::{layout_hash, validate_layout, LayoutMismatchError, FEATURE_VERSION};
use super::detector::StatisticalDetector;
use super::forest::IsolationForest;
use super::standardize::StandardizationParams;
use super::AnomalyModel;

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization Error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    LayoutMismatch(#[from] LayoutMismatchError),

    #[error("detector is not trained")]
    NotTrained,
}

/// Trained detector state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorSnapshot {
    pub feature_version: u8,
    pub layout_hash: u32,
    pub params: StandardizationParams,
    pub forest: IsolationForest,
    pub training_samples: usize,
    pub trained_at: DateTime<Utc>,
    pub saved_at: DateTime<Utc>,
}

impl DetectorSnapshot {
    /// Capture a trained detector
    pub fn capture(detector: &StatisticalDetector<IsolationForest>) -> Result<Self, SnapshotError> {
        let params = detector.params().cloned().ok_or(SnapshotError::NotTrained)?;
        let trained_at = detector.trained_at().ok_or(SnapshotError::NotTrained)?;
        if !detector.model().is_trained() {
            return Err(SnapshotError::NotTrained);
        }

        Ok(Self {
            feature_version: FEATURE_VERSION,
            layout_hash: layout_hash(),
            params,
            forest: detector.model().clone(),
            training_samples: detector.training_samples(),
            trained_at,
            saved_at: Utc::now(),
        })
    }

    pub fn validate(&self) -> Result<(), SnapshotError> {
        validate_layout(self.feature_version, self.layout_hash)?;
        if !self.forest.is_trained() {
            return Err(SnapshotError::NotTrained);
        }
        Ok(())
    }
}

/// Default snapshot path for a user
pub fn get_default_snapshot_path(user_id: i64) -> PathBuf {
    get_data_dir()
        .join("detectors")
        .join(format!("detector_user_{}.json", user_id))
}

pub fn save_snapshot(snapshot: &DetectorSnapshot, path: &Path) -> Result<(), SnapshotError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_vec_pretty(snapshot)?;
    fs::write(path, json)?;
    Ok(())
}

/// Load and validate
pub fn load_snapshot(path: &Path) -> Result<DetectorSnapshot, SnapshotError> {
    let data = fs::read(path)?;
    let snapshot: DetectorSnapshot = serde_json::from_slice(&data)?;
    snapshot.validate()?;
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::config::VerifierConfig;
    use crate::logic::features::{FeatureWindow, Sample};

    fn trained() -> StatisticalDetector {
        let mut window = FeatureWindow::new(50);
        for i in 0..20 {
            let t = i as f64;
            window.push(Sample::now(0.8 + 0.02 * t.cos(), 0.02 + 0.001 * t.sin()));
        }
        let mut d = StatisticalDetector::from_config(&VerifierConfig::default());
        d.fit(&window).unwrap();
        d
    }

    #[test]
    fn test_capture_untrained_fails() {
        let d = StatisticalDetector::from_config(&VerifierConfig::default());
        assert!(matches!(DetectorSnapshot::capture(&d), Err(SnapshotError::NotTrained)));
    }

    #[test]
    fn test_save_load_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("detector.json");

        let original = DetectorSnapshot::capture(&trained()).unwrap();
        save_snapshot(&original, &path).unwrap();

        let loaded = load_snapshot(&path).unwrap();
        for i in 0..3 {
            assert!((loaded.params.mean[i] - original.params.mean[i]).abs() < 1e-12);
            assert!((loaded.params.std[i] - original.params.std[i]).abs() < 1e-12);
        }
        assert_eq!(loaded.training_samples, 20);
        assert_eq!(loaded.forest.tree_count(), original.forest.tree_count());
    }

    #[test]
    fn test_reject_layout_hash_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("detector.json");

        let mut snapshot = DetectorSnapshot::capture(&trained()).unwrap();
        snapshot.layout_hash = !layout_hash();
        save_snapshot(&snapshot, &path).unwrap();

        match load_snapshot(&path) {
            Err(SnapshotError::LayoutMismatch(e)) => {
                assert_eq!(e.expected_hash, layout_hash());
            }
            other => panic!("Expected LayoutMismatch error, got {:?}", other.map(|s| s.feature_version)),
        }
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_snapshot(&dir.path().join("absent.json"));
        assert!(matches!(result, Err(SnapshotError::Io(_))));
    }
}
