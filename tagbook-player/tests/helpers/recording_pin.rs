//! Indicator pin that records what it was told

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tagbook_player::status_light::{IndicatorPin, StatusLight};

#[derive(Debug, Clone, Default)]
pub struct RecordingPin {
    levels: Arc<Mutex<Vec<bool>>>,
    released: Arc<AtomicBool>,
    stop_after: Option<(usize, StatusLight)>,
}

impl RecordingPin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask `light` to exit once `writes` levels have been recorded
    pub fn stopping_after(writes: usize, light: &StatusLight) -> Self {
        Self {
            stop_after: Some((writes, light.clone())),
            ..Self::default()
        }
    }

    pub fn levels(&self) -> Vec<bool> {
        self.levels.lock().unwrap().clone()
    }

    pub fn released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

impl IndicatorPin for RecordingPin {
    fn set(&mut self, on: bool) -> io::Result<()> {
        let mut levels = self.levels.lock().unwrap();
        levels.push(on);
        if let Some((limit, light)) = &self.stop_after {
            if levels.len() >= *limit {
                light.request_exit();
            }
        }
        Ok(())
    }

    fn release(&mut self) -> io::Result<()> {
        self.released.store(true, Ordering::SeqCst);
        Ok(())
    }
}
