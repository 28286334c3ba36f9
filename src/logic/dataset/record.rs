use serde::{Deserialize, Serialize};

use crate::logic::engine::{Assessment, Verdict};
use crate::logic::features::layout::{layout_hash, FEATURE_VERSION};
use crate::logic::physics::PhysicsClass;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DatasetRecord {
    /// Unix millis of the sample
    pub timestamp: i64,
    pub user_id: i64,

    // Feature contract
    pub feature_version: u8,
    pub layout_hash: u32,
    pub features: Vec<f64>,

    // Stage outputs
    pub physics: PhysicsClass,
    pub anomaly_score: Option<f64>,
    pub threshold: Option<f64>,

    // Final decision
    pub verdict: Verdict,
    pub reward: f64,
}

impl DatasetRecord {
    pub fn from_assessment(user_id: i64, assessment: &Assessment) -> Self {
        Self {
            timestamp: assessment.sample.timestamp().timestamp_millis(),
            user_id,
            feature_version: FEATURE_VERSION,
            layout_hash: layout_hash(),
            features: assessment.sample.features().to_vec(),
            physics: assessment.physics,
            anomaly_score: assessment.detector.as_ref().map(|d| d.anomaly_score),
            threshold: assessment.detector.as_ref().map(|d| d.threshold),
            verdict: assessment.verdict,
            reward: assessment.reward_increment,
        }
    }
}
