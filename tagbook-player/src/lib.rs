//! # tagbook reader library (tagbook-player)
//!
//! Audiobook playback driven by RFID tags.
//!
//! **Purpose:** Read a book tag, queue that book's parts on an MPD daemon,
//! resume where the listener left off, and keep listening progress in
//! SQLite. Buttons pause, rewind and change volume; a status light shows
//! what the reader is doing.
//!
//! **Architecture:** one [`playback::PlaybackController`] owns the daemon
//! connection and the session. The poll loop and the button dispatcher are
//! its only callers; observers follow its event stream.

pub mod daemon;
pub mod db;
pub mod error;
pub mod gpio;
pub mod input;
pub mod observers;
pub mod playback;
pub mod poll_loop;
pub mod status_light;
pub mod types;

pub use error::{Error, Result};
pub use playback::{PlaybackController, PlayerEvent};
pub use types::BookId;
