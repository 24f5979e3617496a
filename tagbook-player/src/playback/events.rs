//! Controller events
//!
//! Every state change the controller makes is announced on a broadcast
//! channel. Observers (the status light, volume persistence, logging) react
//! to these without touching the controller lock.

use crate::types::BookId;

/// Something the playback controller did or failed to do
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    /// A book was queued and started, possibly from saved progress
    BookLoaded {
        book_id: BookId,
        part: u32,
        elapsed: f64,
        resumed: bool,
    },

    /// The daemon has no files for the tag that was read
    BookNotFound { book_id: BookId },

    Paused,
    Resumed,

    /// Playback stopped and the session was cleared
    Stopped,

    /// The last part ran out; saved progress was deleted
    BookFinished { book_id: BookId },

    /// Position jumped back
    Rewound { part: u32, elapsed: f64 },

    VolumeChanged { percent: u8 },

    /// Operation not valid in the current state (e.g. pause while stopped)
    InvalidOperation { operation: &'static str },

    /// Daemon or storage call failed; the session kept its last state
    Fault {
        operation: &'static str,
        message: String,
    },
}

impl PlayerEvent {
    /// Whether the event reports a failure of some kind
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            PlayerEvent::BookNotFound { .. }
                | PlayerEvent::InvalidOperation { .. }
                | PlayerEvent::Fault { .. }
        )
    }
}
