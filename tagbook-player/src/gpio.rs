//! Minimal sysfs GPIO access
//!
//! Pins are exported under `<root>/gpioN` and driven through their
//! `direction` and `value` files. The root is configurable so tests can point
//! it at a temporary directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Pin direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    fn as_str(self) -> &'static str {
        match self {
            Direction::In => "in",
            Direction::Out => "out",
        }
    }
}

/// Directory of an exported pin
pub fn pin_dir(root: &Path, pin: u32) -> PathBuf {
    root.join(format!("gpio{}", pin))
}

/// Export a pin (if needed) and set its direction
///
/// Returns the path of the pin's `value` file.
pub fn export(root: &Path, pin: u32, direction: Direction) -> io::Result<PathBuf> {
    let dir = pin_dir(root, pin);
    if !dir.exists() {
        fs::write(root.join("export"), pin.to_string())?;
        debug!("Exported GPIO {}", pin);
    }
    fs::write(dir.join("direction"), direction.as_str())?;
    Ok(dir.join("value"))
}

/// Give a pin back to the kernel
pub fn unexport(root: &Path, pin: u32) -> io::Result<()> {
    if pin_dir(root, pin).exists() {
        fs::write(root.join("unexport"), pin.to_string())?;
        debug!("Unexported GPIO {}", pin);
    }
    Ok(())
}

/// Read a pin level from its `value` file
pub fn read_level(value_path: &Path) -> io::Result<bool> {
    let raw = fs::read_to_string(value_path)?;
    Ok(raw.trim() != "0")
}

/// Write a pin level to its `value` file
pub fn write_level(value_path: &Path, level: bool) -> io::Result<()> {
    fs::write(value_path, if level { "1" } else { "0" })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_export_existing_pin_sets_direction() {
        let root = TempDir::new().unwrap();
        fs::create_dir(root.path().join("gpio23")).unwrap();

        let value = export(root.path(), 23, Direction::Out).unwrap();

        assert_eq!(value, root.path().join("gpio23").join("value"));
        assert_eq!(
            fs::read_to_string(root.path().join("gpio23").join("direction")).unwrap(),
            "out"
        );
    }

    #[test]
    fn test_level_roundtrip() {
        let root = TempDir::new().unwrap();
        let value = root.path().join("value");

        write_level(&value, true).unwrap();
        assert!(read_level(&value).unwrap());
        write_level(&value, false).unwrap();
        assert!(!read_level(&value).unwrap());
    }
}
