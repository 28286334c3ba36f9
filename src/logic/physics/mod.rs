//! Physics Module
//!
//! Phân loại plausibility dựa trên giới hạn vật lý của nguồn.
//! Đây là FAST PATH - quyết định trước khi gọi statistical detector.
//!
//! ## Structure
//! - `types`: PhysicsClass, PhysicsResult
//! - `rules`: Bounds and defaults
//! - `classifier`: Classification logic
//!
//! ## Usage
//! ```ignore
//! use visionx_core::logic::physics::{PhysicsRuleEngine, PhysicsClass};
//!
//! match PhysicsRuleEngine::default().classify(&sample) {
//!     PhysicsClass::DefinitelyFraud => println!("Grid/battery"),
//!     PhysicsClass::DefinitelyGenuine => println!("Solar"),
//!     PhysicsClass::Inconclusive => println!("Ask the detector"),
//! }
//! ```

pub mod types;
pub mod rules;
pub mod classifier;

pub use types::{PhysicsClass, PhysicsResult};
pub use rules::{PhysicsBounds, VoltageBand};
pub use classifier::{classify_voltage, PhysicsRuleEngine};
