//! Indicator outputs

use crate::gpio::{self, Direction};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Something that can show a boolean level
pub trait IndicatorPin: Send {
    fn set(&mut self, on: bool) -> io::Result<()>;

    /// Hand the output back; called once when the light loop exits
    fn release(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Indicator that only logs level changes
///
/// Used when no output pin is configured.
#[derive(Debug, Default)]
pub struct LogPin {
    last: Option<bool>,
}

impl IndicatorPin for LogPin {
    fn set(&mut self, on: bool) -> io::Result<()> {
        if self.last != Some(on) {
            debug!("Status light {}", if on { "on" } else { "off" });
            self.last = Some(on);
        }
        Ok(())
    }
}

/// Indicator driven through a sysfs GPIO output
#[derive(Debug)]
pub struct SysfsPin {
    root: PathBuf,
    pin: u32,
    value_path: PathBuf,
}

impl SysfsPin {
    pub fn open(root: &Path, pin: u32) -> io::Result<Self> {
        let value_path = gpio::export(root, pin, Direction::Out)?;
        info!("Status light on GPIO {}", pin);
        Ok(Self {
            root: root.to_path_buf(),
            pin,
            value_path,
        })
    }
}

impl IndicatorPin for SysfsPin {
    fn set(&mut self, on: bool) -> io::Result<()> {
        gpio::write_level(&self.value_path, on)
    }

    fn release(&mut self) -> io::Result<()> {
        gpio::write_level(&self.value_path, false)?;
        gpio::unexport(&self.root, self.pin)
    }
}
