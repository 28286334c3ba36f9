//! Engine Status - serializable snapshot for operators

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::logic::features::WindowStatus;
use crate::logic::model::ThresholdStats;
use super::types::{EngineState, Verdict};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineStatus {
    pub feature_version: u8,
    pub layout_hash: u32,
    pub feature_count: usize,

    pub state: EngineState,
    pub window: WindowStatus,
    pub model: ModelStatus,
    pub verdicts: VerdictCounters,
    pub total_reward_issued: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelStatus {
    pub engine: String,
    pub trained: bool,
    pub trained_at: Option<DateTime<Utc>>,
    pub trained_on_samples: usize,
    pub trainings: u64,
    pub threshold: Option<ThresholdStats>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerdictCounters {
    pub authentic: u64,
    pub anomalous: u64,
    pub uncertain: u64,
}

impl VerdictCounters {
    pub fn record(&mut self, verdict: Verdict) {
        match verdict {
            Verdict::Authentic => self.authentic += 1,
            Verdict::Anomalous => self.anomalous += 1,
            Verdict::Uncertain => self.uncertain += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.authentic + self.anomalous + self.uncertain
    }
}
