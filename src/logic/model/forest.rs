//! Isolation Forest
//!
//! Ensemble of random isolation trees over standardized rows.
//! Outliers are separated by fewer random splits, so their average
//! path length is short and their score `2^(-E[h]/c(psi))` is high.
//!
//! A query that falls outside the range of the training rows seen at a
//! node is isolated at that node (path = depth + 1).

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_CONTAMINATION_RATE, DEFAULT_DETECTOR_SEED, DEFAULT_MAX_SAMPLES, DEFAULT_N_ESTIMATORS};
use crate::logic::features::{FeatureRow, FEATURE_COUNT};
use super::threshold::{ContaminationThreshold, ThresholdStats};
use super::{AnomalyModel, DetectorError};

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

// ============================================================================
// CONFIG
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForestConfig {
    pub n_estimators: usize,
    pub max_samples: usize,
    pub contamination: f64,
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: DEFAULT_N_ESTIMATORS,
            max_samples: DEFAULT_MAX_SAMPLES,
            contamination: DEFAULT_CONTAMINATION_RATE,
            seed: DEFAULT_DETECTOR_SEED,
        }
    }
}

// ============================================================================
// TREE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    Internal {
        feature: usize,
        split: f64,
        /// Range of the node's rows on `feature`
        min: f64,
        max: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
    Leaf {
        size: usize,
        mins: FeatureRow,
        maxs: FeatureRow,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct IsolationTree {
    root: Node,
}

impl IsolationTree {
    fn build(rows: &[FeatureRow], height_limit: usize, rng: &mut StdRng) -> Self {
        Self {
            root: build_node(rows, 0, height_limit, rng),
        }
    }

    fn path_length(&self, x: &FeatureRow) -> f64 {
        let mut node = &self.root;
        let mut depth = 0.0;

        loop {
            match node {
                Node::Internal { feature, split, min, max, left, right } => {
                    let v = x[*feature];
                    if v < *min || v > *max {
                        return depth + 1.0;
                    }
                    node = if v < *split { left } else { right };
                    depth += 1.0;
                }
                Node::Leaf { size, mins, maxs } => {
                    let outside = (0..FEATURE_COUNT).any(|f| x[f] < mins[f] || x[f] > maxs[f]);
                    let tail = average_path_length(*size);
                    return if outside { depth + tail.min(1.0) } else { depth + tail };
                }
            }
        }
    }
}

fn bounds(rows: &[FeatureRow]) -> (FeatureRow, FeatureRow) {
    let mut mins = [f64::INFINITY; FEATURE_COUNT];
    let mut maxs = [f64::NEG_INFINITY; FEATURE_COUNT];

    for row in rows {
        for f in 0..FEATURE_COUNT {
            mins[f] = mins[f].min(row[f]);
            maxs[f] = maxs[f].max(row[f]);
        }
    }

    (mins, maxs)
}

fn build_node(rows: &[FeatureRow], depth: usize, height_limit: usize, rng: &mut StdRng) -> Node {
    let (mins, maxs) = bounds(rows);
    let candidates: Vec<usize> = (0..FEATURE_COUNT).filter(|&f| maxs[f] > mins[f]).collect();

    if depth >= height_limit || rows.len() <= 1 || candidates.is_empty() {
        return Node::Leaf { size: rows.len(), mins, maxs };
    }

    let feature = candidates[rng.gen_range(0..candidates.len())];
    let (lo, hi) = (mins[feature], maxs[feature]);
    let mut split = rng.gen_range(lo..hi);
    if split <= lo {
        // keep both children non-empty
        split = lo + (hi - lo) / 2.0;
    }

    let (left, right): (Vec<FeatureRow>, Vec<FeatureRow>) =
        rows.iter().copied().partition(|r| r[feature] < split);

    Node::Internal {
        feature,
        split,
        min: lo,
        max: hi,
        left: Box::new(build_node(&left, depth + 1, height_limit, rng)),
        right: Box::new(build_node(&right, depth + 1, height_limit, rng)),
    }
}

/// Average path length of an unsuccessful BST search, `c(n)`
pub fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

// ============================================================================
// FOREST
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsolationForest {
    config: ForestConfig,
    trees: Vec<IsolationTree>,
    subsample_size: usize,
    threshold: Option<ContaminationThreshold>,
}

impl Default for IsolationForest {
    fn default() -> Self {
        Self::new(ForestConfig::default())
    }
}

impl IsolationForest {
    pub fn new(config: ForestConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            subsample_size: 0,
            threshold: None,
        }
    }

    pub fn config(&self) -> &ForestConfig {
        &self.config
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    pub fn threshold_stats(&self) -> Option<ThresholdStats> {
        self.threshold.as_ref().map(ContaminationThreshold::stats)
    }

    fn raw_score(&self, x: &FeatureRow) -> f64 {
        let mean_path = self.trees.iter().map(|t| t.path_length(x)).sum::<f64>() / self.trees.len() as f64;
        let norm = average_path_length(self.subsample_size);
        2f64.powf(-mean_path / norm)
    }
}

impl AnomalyModel for IsolationForest {
    fn fit(&mut self, data: &[FeatureRow]) -> Result<(), DetectorError> {
        let n = data.len();
        if n < 2 {
            return Err(DetectorError::InsufficientData { have: n, need: 2 });
        }

        let psi = self.config.max_samples.clamp(2, n);
        let height_limit = (psi as f64).log2().ceil() as usize;
        let mut rng = StdRng::seed_from_u64(self.config.seed);

        let trees = (0..self.config.n_estimators.max(1))
            .map(|_| {
                let subsample: Vec<FeatureRow> = rand::seq::index::sample(&mut rng, n, psi)
                    .into_iter()
                    .map(|i| data[i])
                    .collect();
                IsolationTree::build(&subsample, height_limit, &mut rng)
            })
            .collect();

        self.trees = trees;
        self.subsample_size = psi;

        let scores: Vec<f64> = data.iter().map(|r| self.raw_score(r)).collect();
        self.threshold = Some(ContaminationThreshold::from_scores(&scores, self.config.contamination));

        Ok(())
    }

    fn score(&self, sample: &FeatureRow) -> Result<f64, DetectorError> {
        if !self.is_trained() {
            return Err(DetectorError::NotTrained);
        }
        Ok(self.raw_score(sample))
    }

    fn predict(&self, sample: &FeatureRow) -> Result<bool, DetectorError> {
        let score = self.score(sample)?;
        let threshold = self.threshold.as_ref().ok_or(DetectorError::NotTrained)?;
        Ok(threshold.is_outlier(score))
    }

    fn threshold(&self) -> Option<f64> {
        self.threshold.as_ref().map(|t| t.get())
    }

    fn name(&self) -> &str {
        "isolation_forest"
    }

    fn is_trained(&self) -> bool {
        !self.trees.is_empty() && self.threshold.is_some()
    }
}

// ============================================================================
// TESTS
// ============================================================================
