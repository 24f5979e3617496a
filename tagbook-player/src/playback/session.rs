//! In-memory playback session
//!
//! Which book is associated with playback, and where in it we are. Owned and
//! mutated only by the playback controller.

use crate::types::BookId;

/// Current book, part and position
///
/// Invariants: `part >= 1`, `volume_percent <= 100`, and an empty session
/// (`book_id == None`) is always at part 1, second 0.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSession {
    book_id: Option<BookId>,
    part: u32,
    elapsed: f64,
    volume_percent: u8,
}

impl PlaybackSession {
    /// Empty session at the given device volume
    pub fn new(volume_percent: u8) -> Self {
        Self {
            book_id: None,
            part: 1,
            elapsed: 0.0,
            volume_percent: volume_percent.min(100),
        }
    }

    /// Replace the session with a freshly loaded book
    pub fn load(&mut self, book_id: BookId, part: u32, elapsed: f64) {
        self.book_id = Some(book_id);
        self.part = part.max(1);
        self.elapsed = elapsed.max(0.0);
    }

    /// Record a position confirmed by the daemon
    ///
    /// Ignored when no book is loaded, keeping the reset state intact.
    pub fn set_position(&mut self, part: u32, elapsed: f64) {
        if self.book_id.is_some() {
            self.part = part.max(1);
            self.elapsed = elapsed.max(0.0);
        }
    }

    /// Back to the empty state; volume is a device setting and survives
    pub fn reset(&mut self) {
        self.book_id = None;
        self.part = 1;
        self.elapsed = 0.0;
    }

    pub fn book_id(&self) -> Option<&BookId> {
        self.book_id.as_ref()
    }

    pub fn is_loaded(&self) -> bool {
        self.book_id.is_some()
    }

    pub fn part(&self) -> u32 {
        self.part
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn volume_percent(&self) -> u8 {
        self.volume_percent
    }

    pub fn set_volume_percent(&mut self, volume: u8) {
        self.volume_percent = volume.min(100);
    }
}

impl Default for PlaybackSession {
    fn default() -> Self {
        Self::new(100)
    }
}
