//! Source Module - Where samples come from
//!
//! Core engine không biết nguồn dữ liệu. Live device và synthetic generator
//! là hai implementation của cùng một trait, chọn bằng config.
//!
//! ## Structure
//! - `line` - `voltage,current,power` text lines (serial device, stdin, file)
//! - `synthetic` - Seeded generator (solar cell / spoofed grid)

pub mod line;
pub mod synthetic;

use std::path::PathBuf;
use serde::{Deserialize, Serialize};

use crate::logic::features::Sample;

pub use line::{open_device, parse_line, LineSource};
pub use synthetic::{SyntheticProfile, SyntheticSource};

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("source IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot open device {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ============================================================================
// TRAIT
// ============================================================================

pub trait SampleSource {
    /// Next sample if one is available this tick. Malformed input yields
    /// `Ok(None)`, never a Sample.
    fn poll(&mut self) -> Result<Option<Sample>, SourceError>;

    /// True once the source can never produce another sample (EOF)
    fn is_exhausted(&self) -> bool {
        false
    }

    /// Whether this source stands in for a live device
    fn is_simulated(&self) -> bool {
        false
    }

    fn describe(&self) -> String;
}

// ============================================================================
// SELECTION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceKind {
    /// Character device or file streaming text lines
    Device { path: PathBuf },
    /// Lines piped through stdin
    Stdin,
    Synthetic {
        profile: SyntheticProfile,
        seed: u64,
        anomaly_rate: f64,
    },
}

impl SourceKind {
    /// Parse `VISIONX_SOURCE` style values:
    /// `stdin`, `solar`, `grid`, or a device path
    pub fn parse(value: &str, seed: u64, anomaly_rate: f64) -> Self {
        match value.trim() {
            "stdin" | "-" => SourceKind::Stdin,
            "solar" | "synthetic" => SourceKind::Synthetic {
                profile: SyntheticProfile::Solar,
                seed,
                anomaly_rate,
            },
            "grid" | "grid_spoof" => SourceKind::Synthetic {
                profile: SyntheticProfile::GridSpoof,
                seed,
                anomaly_rate,
            },
            path => SourceKind::Device { path: PathBuf::from(path) },
        }
    }
}

pub fn build_source(kind: &SourceKind) -> Result<Box<dyn SampleSource>, SourceError> {
    let source: Box<dyn SampleSource> = match kind {
        SourceKind::Device { path } => Box::new(open_device(path)?),
        SourceKind::Stdin => Box::new(LineSource::new(
            std::io::BufReader::new(std::io::stdin()),
            "stdin",
        )),
        SourceKind::Synthetic { profile, seed, anomaly_rate } => Box::new(
            SyntheticSource::new(*profile, *seed).with_anomaly_rate(*anomaly_rate),
        ),
    };

    log::info!("Sample source: {}", source.describe());
    Ok(source)
}
