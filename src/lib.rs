//! VISION-X Verification Core
//!
//! Two-stage verification of renewable generation readings:
//! physics plausibility rules, then an isolation forest for the gray zone.

pub mod constants;
pub mod logic;
