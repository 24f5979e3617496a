//! Status light: base pattern plus interrupt overlays

pub mod patterns;
pub mod pin;
pub mod scheduler;

pub use patterns::{LightPattern, PatternName};
pub use pin::{IndicatorPin, LogPin, SysfsPin};
pub use scheduler::StatusLight;
