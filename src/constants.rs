//! Central Configuration Constants
//!
//! Single source of truth for all configuration defaults.
//! Env overrides use the `VISIONX_` prefix.

use std::path::PathBuf;

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name
pub const APP_NAME: &str = "VISION-X";

// ============================================
// Verification defaults
// ============================================

/// A single small cell cannot exceed this open-circuit voltage (V)
pub const DEFAULT_FRAUD_VOLTAGE_CEILING: f64 = 2.0;

/// Plausible generation band, both bounds exclusive (V)
pub const DEFAULT_GENUINE_BAND_LOW: f64 = 0.0;
pub const DEFAULT_GENUINE_BAND_HIGH: f64 = 1.5;

/// Samples required before the first calibration
pub const DEFAULT_MIN_TRAINING_WINDOW: usize = 20;

/// FIFO window size
pub const DEFAULT_WINDOW_CAPACITY: usize = 50;

/// Expected outlier proportion for the forest
pub const DEFAULT_CONTAMINATION_RATE: f64 = 0.1;

/// Power must be strictly above this to earn coins
pub const DEFAULT_IDLE_POWER_FLOOR: f64 = 0.0;

/// Coins per power unit of verified generation
pub const DEFAULT_REWARD_RATE: f64 = 0.0001;

// ============================================
// Detector defaults
// ============================================

pub const DEFAULT_N_ESTIMATORS: usize = 100;
pub const DEFAULT_MAX_SAMPLES: usize = 256;
pub const DEFAULT_DETECTOR_SEED: u64 = 42;
pub const DEFAULT_STD_EPSILON: f64 = 1e-6;

// ============================================
// Runtime defaults
// ============================================

/// Poll interval for a live sensor link (ms)
pub const DEFAULT_LIVE_POLL_MS: u64 = 500;

/// Poll interval when simulating (ms)
pub const DEFAULT_SIMULATED_POLL_MS: u64 = 100;

/// Reward cooldown after an anomaly (seconds, 0 = off)
pub const DEFAULT_PENALTY_SECS: u64 = 0;

/// Audit rows shown by `history`
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

/// Data directory name under the user's local data dir
pub const DATA_DIR_NAME: &str = "visionx";

// ============================================
// Helper functions to read from env with fallback
// ============================================

/// Base directory for ledger, snapshots and datasets
pub fn get_data_dir() -> PathBuf {
    std::env::var("VISIONX_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(DATA_DIR_NAME)
        })
}

/// SQLite ledger path
pub fn get_ledger_path() -> PathBuf {
    std::env::var("VISIONX_LEDGER_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| get_data_dir().join("users.db"))
}

/// Parse an env var, falling back to `default` when unset or invalid
pub fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

/// Boolean env flag ("false"/"0" disable, anything else enables)
pub fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|s| s.to_lowercase() != "false" && s != "0")
        .unwrap_or(default)
}
