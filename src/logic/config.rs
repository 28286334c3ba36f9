//! Verifier Configuration
//!
//! Configuration surface accepted by the Verification Engine at construction.
//! Can be loaded from a JSON file, from `VISIONX_*` env vars, or built in code.

use std::path::Path;
use serde::{Deserialize, Serialize};

use crate::constants::{
    env_or, DEFAULT_CONTAMINATION_RATE, DEFAULT_DETECTOR_SEED, DEFAULT_IDLE_POWER_FLOOR,
    DEFAULT_MAX_SAMPLES, DEFAULT_MIN_TRAINING_WINDOW, DEFAULT_N_ESTIMATORS, DEFAULT_REWARD_RATE,
    DEFAULT_STD_EPSILON, DEFAULT_WINDOW_CAPACITY,
};
use crate::logic::physics::{PhysicsBounds, VoltageBand};

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

// ============================================================================
// DETECTOR TUNING
// ============================================================================

/// Isolation forest knobs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorTuning {
    /// Trees in the ensemble
    pub n_estimators: usize,
    /// Rows subsampled per tree
    pub max_samples: usize,
    /// RNG seed, fixed for reproducible verdicts
    pub seed: u64,
    /// Floor for per-feature standard deviation
    pub std_epsilon: f64,
}

impl Default for DetectorTuning {
    fn default() -> Self {
        Self {
            n_estimators: DEFAULT_N_ESTIMATORS,
            max_samples: DEFAULT_MAX_SAMPLES,
            seed: DEFAULT_DETECTOR_SEED,
            std_epsilon: DEFAULT_STD_EPSILON,
        }
    }
}

// ============================================================================
// VERIFIER CONFIG
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    #[serde(flatten)]
    pub physics: PhysicsBounds,
    /// Samples before the first fit
    pub min_training_window: usize,
    /// FIFO window size
    pub window_capacity: usize,
    /// Expected outlier proportion
    pub contamination_rate: f64,
    /// Power must be strictly above this to earn rewards
    pub idle_power_floor: f64,
    /// Reward per power unit of verified generation
    pub reward_rate_per_power_unit: f64,
    pub detector: DetectorTuning,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            physics: PhysicsBounds::default(),
            min_training_window: DEFAULT_MIN_TRAINING_WINDOW,
            window_capacity: DEFAULT_WINDOW_CAPACITY,
            contamination_rate: DEFAULT_CONTAMINATION_RATE,
            idle_power_floor: DEFAULT_IDLE_POWER_FLOOR,
            reward_rate_per_power_unit: DEFAULT_REWARD_RATE,
            detector: DetectorTuning::default(),
        }
    }
}

impl VerifierConfig {
    /// Conservative mode - fewer outliers expected, so fewer flags
    pub fn lenient() -> Self {
        Self {
            contamination_rate: 0.05,
            ..Default::default()
        }
    }

    /// Load from JSON; missing keys take defaults
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read(path)?;
        let config: VerifierConfig = serde_json::from_slice(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults (or the `VISIONX_PRESET=lenient` preset) overridden by
    /// `VISIONX_*` env vars
    pub fn from_env() -> Result<Self, ConfigError> {
        let d = match std::env::var("VISIONX_PRESET").as_deref() {
            Ok("lenient") => Self::lenient(),
            _ => Self::default(),
        };

        let config = Self {
            physics: PhysicsBounds {
                fraud_voltage_ceiling: env_or("VISIONX_FRAUD_VOLTAGE_CEILING", d.physics.fraud_voltage_ceiling),
                genuine_voltage_band: VoltageBand::new(
                    env_or("VISIONX_GENUINE_BAND_LOW", d.physics.genuine_voltage_band.low),
                    env_or("VISIONX_GENUINE_BAND_HIGH", d.physics.genuine_voltage_band.high),
                ),
            },
            min_training_window: env_or("VISIONX_MIN_TRAINING_WINDOW", d.min_training_window),
            window_capacity: env_or("VISIONX_WINDOW_CAPACITY", d.window_capacity),
            contamination_rate: env_or("VISIONX_CONTAMINATION_RATE", d.contamination_rate),
            idle_power_floor: env_or("VISIONX_IDLE_POWER_FLOOR", d.idle_power_floor),
            reward_rate_per_power_unit: env_or("VISIONX_REWARD_RATE", d.reward_rate_per_power_unit),
            detector: DetectorTuning {
                n_estimators: env_or("VISIONX_N_ESTIMATORS", d.detector.n_estimators),
                max_samples: env_or("VISIONX_MAX_SAMPLES", d.detector.max_samples),
                seed: env_or("VISIONX_DETECTOR_SEED", d.detector.seed),
                std_epsilon: env_or("VISIONX_STD_EPSILON", d.detector.std_epsilon),
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let band = self.physics.genuine_voltage_band;
        let ceiling = self.physics.fraud_voltage_ceiling;

        let finite = [band.low, band.high, ceiling, self.contamination_rate, self.idle_power_floor,
            self.reward_rate_per_power_unit, self.detector.std_epsilon];
        if finite.iter().any(|v| !v.is_finite()) {
            return Err(ConfigError::Invalid("numeric options must be finite".into()));
        }
        if band.low >= band.high {
            return Err(ConfigError::Invalid(format!(
                "genuine band low ({}) must be below high ({})", band.low, band.high
            )));
        }
        if ceiling < band.high {
            return Err(ConfigError::Invalid(format!(
                "fraud ceiling ({}) must not be below genuine band high ({})", ceiling, band.high
            )));
        }
        if self.min_training_window < 2 {
            return Err(ConfigError::Invalid("min_training_window must be at least 2".into()));
        }
        if self.window_capacity < self.min_training_window {
            return Err(ConfigError::Invalid(format!(
                "window_capacity ({}) must hold min_training_window ({})",
                self.window_capacity, self.min_training_window
            )));
        }
        if self.contamination_rate <= 0.0 || self.contamination_rate > 0.5 {
            return Err(ConfigError::Invalid(format!(
                "contamination_rate must be in (0, 0.5], got {}", self.contamination_rate
            )));
        }
        if self.idle_power_floor < 0.0 || self.reward_rate_per_power_unit < 0.0 {
            return Err(ConfigError::Invalid("reward floor and rate must be non-negative".into()));
        }
        if self.detector.n_estimators == 0 {
            return Err(ConfigError::Invalid("n_estimators must be at least 1".into()));
        }
        if self.detector.max_samples < 2 {
            return Err(ConfigError::Invalid("max_samples must be at least 2".into()));
        }
        if self.detector.std_epsilon <= 0.0 {
            return Err(ConfigError::Invalid("std_epsilon must be positive".into()));
        }

        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = VerifierConfig::default();
        assert_eq!(config.physics.fraud_voltage_ceiling, 2.0);
        assert_eq!(config.min_training_window, 20);
        assert_eq!(config.window_capacity, 50);
        assert_eq!(config.contamination_rate, 0.1);
        assert_eq!(config.reward_rate_per_power_unit, 0.0001);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_lenient_config() {
        let config = VerifierConfig::lenient();
        assert_eq!(config.contamination_rate, 0.05);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_inverted_band() {
        let mut config = VerifierConfig::default();
        config.physics.genuine_voltage_band = VoltageBand::new(1.5, 0.5);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_small_capacity() {
        let config = VerifierConfig {
            window_capacity: 10,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_contamination() {
        for rate in [0.0, 0.75, f64::NAN] {
            let config = VerifierConfig {
                contamination_rate: rate,
                ..Default::default()
            };
            assert!(config.validate().is_err(), "rate {}", rate);
        }
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("verifier.json");
        std::fs::write(
            &path,
            r#"{ "fraud_voltage_ceiling": 3.0, "genuine_voltage_band": { "low": 0.1, "high": 2.5 }, "detector": { "seed": 7 } }"#,
        )
        .unwrap();

        let config = VerifierConfig::from_json_file(&path).unwrap();
        assert_eq!(config.physics.fraud_voltage_ceiling, 3.0);
        assert_eq!(config.physics.genuine_voltage_band.low, 0.1);
        assert_eq!(config.detector.seed, 7);
        assert_eq!(config.detector.n_estimators, 100);
        assert_eq!(config.min_training_window, 20);
    }

    #[test]
    fn test_json_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("verifier.json");
        std::fs::write(&path, r#"{ "min_training_window": 1 }"#).unwrap();

        assert!(matches!(
            VerifierConfig::from_json_file(&path),
            Err(ConfigError::Invalid(_))
        ));
    }
}
