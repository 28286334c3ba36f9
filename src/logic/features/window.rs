//! Feature Window - bounded FIFO of recent samples
//!
//! Dùng cho calibration của detector và hiển thị trend.
//! Oldest sample is dropped once capacity is exceeded.

use std::collections::VecDeque;
use serde::{Deserialize, Serialize};

use super::layout::FeatureRow;
use super::sample::Sample;

#[derive(Debug, Clone)]
pub struct FeatureWindow {
    samples: VecDeque<Sample>,
    capacity: usize,
}

impl FeatureWindow {
    /// Capacity is forced to at least one slot
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample, returning the evicted one if the window was full
    pub fn push(&mut self, sample: Sample) -> Option<Sample> {
        self.samples.push_back(sample);

        if self.samples.len() > self.capacity {
            self.samples.pop_front()
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest first
    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    pub fn latest(&self) -> Option<&Sample> {
        self.samples.back()
    }

    /// Feature rows in FIFO order
    pub fn rows(&self) -> Vec<FeatureRow> {
        self.samples.iter().map(Sample::features).collect()
    }

    /// Single feature series for trend display (index per layout)
    pub fn series(&self, feature: usize) -> Vec<f64> {
        self.samples
            .iter()
            .filter_map(|s| s.features().get(feature).copied())
            .collect()
    }

    pub fn status(&self, required_size: usize) -> WindowStatus {
        let current = self.samples.len();

        WindowStatus {
            current_size: current,
            capacity: self.capacity,
            required_size,
            is_ready: current >= required_size,
            fill_percent: if required_size > 0 {
                (current as f32 / required_size as f32 * 100.0).min(100.0)
            } else {
                100.0
            },
        }
    }
}

/// Window fill information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowStatus {
    pub current_size: usize,
    pub capacity: usize,
    pub required_size: usize,
    pub is_ready: bool,
    pub fill_percent: f32,
}
