//! Dataset Module - Verification Journal
//!
//! Records versioned feature rows and verdicts for offline model work.
//! Stores data in JSONL format with automatic rotation.

pub mod record;
pub mod writer;
pub mod export;


use std::path::PathBuf;

use crate::constants::get_data_dir;

pub use record::DatasetRecord;
pub use writer::{DatasetStats, DatasetWriter};

/// Get the base directory for dataset storage
pub fn get_dataset_dir() -> PathBuf {
    get_data_dir().join("dataset")
}
