//! Logic Module - Verification pipeline & engines
//!
//! Chứa toàn bộ logic xác thực: physics rules, detector, engine, session.
//!
//! ## Architecture
//! - `features/` - Sample, feature layout, rolling window
//! - `physics/` - Plausibility rules (fraud ceiling, generation band)
//! - `model/` - Standardization, isolation forest, snapshots
//! - `engine/` - Verification pipeline + status
//! - `reward/` - Ledger trait, SQLite and in-memory ledgers
//! - `source/` - Sample sources (line stream, synthetic)
//! - `dataset/` - JSONL verification journal

pub mod config;
pub mod display;
pub mod runtime;
pub mod session;

pub mod features;
pub mod physics;
pub mod model;
pub mod engine;
pub mod reward;
pub mod source;
pub mod dataset;
