//! Runtime configuration for the verification daemon

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{
    env_flag, env_or, get_ledger_path, DEFAULT_LIVE_POLL_MS, DEFAULT_PENALTY_SECS,
    DEFAULT_SIMULATED_POLL_MS,
};
use crate::logic::source::{SourceKind, SyntheticProfile};

/// Process-level settings, separate from `VerifierConfig`
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Where samples come from
    pub source: SourceKind,

    /// Existing user to resume
    pub user_id: Option<i64>,

    /// Registration details when no user id is given
    pub user_name: String,
    pub user_phone: String,

    /// SQLite ledger file
    pub ledger_path: PathBuf,

    /// Optional JSON file with `VerifierConfig`
    pub config_path: Option<PathBuf>,

    /// Restore/save the trained detector between runs
    pub persist_detector: bool,

    /// Write the JSONL verification journal
    pub journal: bool,

    /// Merge journal files into this path and exit
    pub export_dataset: Option<PathBuf>,

    pub penalty_secs: u64,

    /// Stop after this many polls (None = until EOF)
    pub max_ticks: Option<u64>,

    pub live_poll: Duration,
    pub simulated_poll: Duration,
}

impl RuntimeConfig {
    /// Load configuration from `VISIONX_*` environment variables
    pub fn from_env() -> Self {
        let seed = env_or("VISIONX_SOURCE_SEED", 42u64);
        let anomaly_rate = env_or("VISIONX_ANOMALY_RATE", 0.0f64);

        let source = if env_flag("VISIONX_SIMULATE_GRID", false) {
            SourceKind::Synthetic {
                profile: SyntheticProfile::GridSpoof,
                seed,
                anomaly_rate,
            }
        } else {
            let raw = env::var("VISIONX_SOURCE").unwrap_or_else(|_| "stdin".to_string());
            SourceKind::parse(&raw, seed, anomaly_rate)
        };

        Self {
            source,

            user_id: env::var("VISIONX_USER_ID")
                .ok()
                .and_then(|v| v.trim().parse().ok()),

            user_name: env::var("VISIONX_USER_NAME")
                .unwrap_or_else(|_| "Producer".to_string()),

            user_phone: env::var("VISIONX_USER_PHONE").unwrap_or_default(),

            ledger_path: get_ledger_path(),

            config_path: env::var("VISIONX_CONFIG").ok().map(PathBuf::from),

            persist_detector: env_flag("VISIONX_PERSIST_DETECTOR", true),

            journal: env_flag("VISIONX_JOURNAL", false),

            export_dataset: env::var("VISIONX_EXPORT_DATASET").ok().map(PathBuf::from),

            penalty_secs: env_or("VISIONX_PENALTY_SECS", DEFAULT_PENALTY_SECS),

            max_ticks: env::var("VISIONX_MAX_TICKS")
                .ok()
                .and_then(|v| v.trim().parse().ok()),

            live_poll: Duration::from_millis(env_or("VISIONX_LIVE_POLL_MS", DEFAULT_LIVE_POLL_MS)),
            simulated_poll: Duration::from_millis(env_or(
                "VISIONX_SIMULATED_POLL_MS",
                DEFAULT_SIMULATED_POLL_MS,
            )),
        }
    }

    /// Faster cadence when the source is simulated
    pub fn poll_interval(&self, simulated: bool) -> Duration {
        if simulated {
            self.simulated_poll
        } else {
            self.live_poll
        }
    }
}
