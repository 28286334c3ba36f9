//! Engine Module - Two-stage green generation verification
//!
//! Physics rules decide the clear cases; the statistical detector decides
//! the gray zone once calibrated.
//!
//! # Architecture
//! - `types.rs`: `Verdict`, `EngineState`, `Assessment`
//! - `verification.rs`: `VerificationEngine` (ingest pipeline)
//! - `status.rs`: Serializable operator view
//!
//! # Failure Strategy
//! Ingest never fails. Detector problems degrade to UNCERTAIN.

pub mod types;
pub mod verification;
pub mod status;
#[cfg(test)]
mod tests;

pub use types::{Assessment, DecisionStage, EngineState, Verdict};
pub use verification::{reward_increment, VerificationEngine};
pub use status::{EngineStatus, ModelStatus, VerdictCounters};
