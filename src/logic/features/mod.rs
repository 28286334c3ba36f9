//! Features Module - Sample, layout and rolling window
//!
//! ## Structure
//! - `layout` - Feature schema (voltage, current, power) + version hash
//! - `sample` - Immutable reading
//! - `window` - Bounded FIFO used for calibration

pub mod layout;
pub mod sample;
pub mod window;

pub use layout::{FeatureRow, FEATURE_COUNT, FEATURE_LAYOUT, FEATURE_VERSION};
pub use sample::Sample;
pub use window::{FeatureWindow, WindowStatus};
