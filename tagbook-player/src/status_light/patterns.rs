//! Named blink patterns
//!
//! The table is a process-wide constant; nothing mutates it at runtime.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// One cyclic light sequence
#[derive(Debug, PartialEq, Eq)]
pub struct LightPattern {
    /// Time each state is held
    pub interval: Duration,

    /// States stepped through in order, then repeated
    pub states: &'static [bool],
}

/// Names of the available patterns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternName {
    /// Solid on: idle, ready for a tag
    On,
    Off,
    /// Short flicker used for interrupts (errors, button feedback)
    BlinkFast,
    /// Steady blink: playing
    Blink,
    /// Mostly dark with a short flash: paused
    BlinkPause,
}

const ON: LightPattern = LightPattern {
    interval: Duration::from_millis(500),
    states: &[true],
};

const OFF: LightPattern = LightPattern {
    interval: Duration::from_millis(500),
    states: &[false],
};

const BLINK_FAST: LightPattern = LightPattern {
    interval: Duration::from_millis(100),
    states: &[false, true],
};

const BLINK: LightPattern = LightPattern {
    interval: Duration::from_millis(500),
    states: &[false, true],
};

const BLINK_PAUSE: LightPattern = LightPattern {
    interval: Duration::from_millis(250),
    states: &[false, false, false, true],
};

impl PatternName {
    pub const ALL: [PatternName; 5] = [
        PatternName::On,
        PatternName::Off,
        PatternName::BlinkFast,
        PatternName::Blink,
        PatternName::BlinkPause,
    ];

    pub fn pattern(self) -> &'static LightPattern {
        match self {
            PatternName::On => &ON,
            PatternName::Off => &OFF,
            PatternName::BlinkFast => &BLINK_FAST,
            PatternName::Blink => &BLINK,
            PatternName::BlinkPause => &BLINK_PAUSE,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PatternName::On => "on",
            PatternName::Off => "off",
            PatternName::BlinkFast => "blink_fast",
            PatternName::Blink => "blink",
            PatternName::BlinkPause => "blink_pause",
        }
    }
}

impl fmt::Display for PatternName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PatternName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        PatternName::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| Error::Config(format!("Unknown light pattern: {}", s)))
    }
}
