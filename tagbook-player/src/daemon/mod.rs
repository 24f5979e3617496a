//! Audio daemon boundary
//!
//! The reader never decodes audio itself. Playback is delegated to an external
//! daemon (MPD) through the [`AudioDaemon`] trait. Implementations are not
//! expected to be thread-safe: the playback controller owns the only handle
//! and serializes every call behind its lock.

pub mod mpd_client;

use crate::error::Result;
use crate::types::BookId;
use async_trait::async_trait;

pub use mpd_client::MpdClient;

/// Transport state reported by the daemon
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonState {
    Play,
    Pause,
    Stop,
}

/// Snapshot of the daemon's `status` response
#[derive(Debug, Clone, PartialEq)]
pub struct DaemonStatus {
    pub state: DaemonState,

    /// Output volume, `None` when the daemon has no mixer
    pub volume: Option<u8>,

    /// Zero-based queue index of the current item
    pub song: Option<u32>,

    /// Seconds into the current item
    pub elapsed: Option<f64>,

    /// Number of items in the play queue
    pub playlist_length: u32,
}

impl DaemonStatus {
    pub fn is_playing(&self) -> bool {
        self.state == DaemonState::Play
    }
}

/// One audio file known to the daemon
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFile {
    /// Path relative to the daemon's music directory
    pub path: String,

    /// Total length in seconds, when the daemon knows it
    pub duration: Option<f64>,
}

impl AudioFile {
    pub fn new(path: impl Into<String>, duration: Option<f64>) -> Self {
        Self {
            path: path.into(),
            duration,
        }
    }
}

/// Blocking request/response control of the playback daemon
///
/// Every call is bounded by the implementation's own timeout and reports
/// failures as transient [`crate::Error`] variants.
#[async_trait]
pub trait AudioDaemon: Send {
    /// Empty the play queue
    async fn clear(&mut self) -> Result<()>;

    /// Append one file to the play queue
    async fn enqueue(&mut self, path: &str) -> Result<()>;

    /// Start (or resume) playback
    async fn play(&mut self) -> Result<()>;

    /// Pause playback, keeping the position
    async fn pause(&mut self) -> Result<()>;

    /// Stop playback
    async fn stop(&mut self) -> Result<()>;

    /// Jump to `seconds` into queue item `part_index` (zero-based) and play
    async fn seek(&mut self, part_index: u32, seconds: f64) -> Result<()>;

    /// Set output volume, 0-100
    async fn set_volume(&mut self, percent: u8) -> Result<()>;

    async fn status(&mut self) -> Result<DaemonStatus>;

    /// The item at the current queue position, if any
    async fn current_item(&mut self) -> Result<Option<AudioFile>>;

    /// Files in the daemon's library whose path matches the book id
    async fn find_files(&mut self, book_id: &BookId) -> Result<Vec<AudioFile>>;

    /// Release the connection; further calls fail
    async fn disconnect(&mut self) -> Result<()>;
}
