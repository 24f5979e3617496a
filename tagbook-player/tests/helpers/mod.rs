//! Test helper modules for tagbook-player integration tests
//!
//! Provides reusable test infrastructure components:
//! - FakeDaemon: scripted in-process audio daemon with a call log
//! - MemoryStore: progress store with switchable write failures
//! - RecordingPin: indicator output that records every level
//! - FakeMpdServer: TCP server speaking just enough MPD protocol
//! - ScriptedTags: tag source replaying a fixed sequence

#![allow(dead_code)]

pub mod fake_daemon;
pub mod fake_mpd;
pub mod memory_store;
pub mod recording_pin;
pub mod scripted_tags;

pub use fake_daemon::{Call, FakeDaemon};
pub use fake_mpd::FakeMpdServer;
pub use memory_store::MemoryStore;
pub use recording_pin::RecordingPin;
pub use scripted_tags::ScriptedTags;

use std::sync::Arc;
use tagbook_player::playback::{ControllerSettings, PlaybackController};

/// Controller over a fake daemon and an in-memory store, default settings
pub fn controller_with(daemon: &FakeDaemon, store: &MemoryStore) -> PlaybackController {
    PlaybackController::new(
        Box::new(daemon.clone()),
        Arc::new(store.clone()),
        ControllerSettings::default(),
        50,
    )
}
