//! Playback controller
//!
//! Owns the playback session and the only handle to the audio daemon. Every
//! public operation takes the controller lock once, for its whole duration,
//! and works through private helpers on the locked state; no public
//! operation calls another one while holding the lock.
//!
//! Daemon failures abort the operation and leave the session at its last
//! confirmed state. They are reported to the caller and announced as
//! [`PlayerEvent::Fault`]; the next poll cycle simply tries again.

use super::events::PlayerEvent;
use super::parts::BookParts;
use super::session::PlaybackSession;
use crate::daemon::{AudioDaemon, AudioFile, DaemonState};
use crate::db::ProgressStore;
use crate::error::Result;
use crate::types::BookId;
use std::sync::Arc;
use tagbook_common::config::PlaybackConfig;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

/// Buffered controller events per subscriber
const EVENT_CAPACITY: usize = 64;

/// Tunables of the controller
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerSettings {
    /// How far one rewind jumps back
    pub rewind_seconds: f64,

    /// A stopped last part with less than this left counts as finished
    pub finish_tolerance_seconds: f64,

    /// Volume change per step, in percent
    pub volume_step: u8,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            rewind_seconds: 20.0,
            finish_tolerance_seconds: 20.0,
            volume_step: 10,
        }
    }
}

impl From<&PlaybackConfig> for ControllerSettings {
    fn from(config: &PlaybackConfig) -> Self {
        Self {
            rewind_seconds: config.rewind_seconds,
            finish_tolerance_seconds: config.finish_tolerance_seconds,
            volume_step: config.volume_step,
        }
    }
}

/// Result of [`PlaybackController::load_and_play`]
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// Book queued and playing from (`part`, `elapsed`)
    Playing { part: u32, elapsed: f64, resumed: bool },

    /// No files for the book; the session is empty
    BookNotFound,

    /// The book was already the current one; nothing changed
    AlreadyLoaded,
}

/// Result of [`PlaybackController::on_status_tick`]
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// No book loaded
    Idle,

    /// Book loaded; `persisted` tells whether progress was written this tick
    Progress { part: u32, elapsed: f64, persisted: bool },

    /// The book ran out; its progress was deleted and the session cleared
    Finished { book_id: BookId },
}

/// Result of [`PlaybackController::toggle_pause`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseOutcome {
    Paused,
    Resumed,

    /// The daemon was stopped; nothing to pause or resume
    Invalid,
}

/// Where a rewind lands, as (zero-based part index, seconds)
///
/// More than `look_back` into the part jumps back within it. Otherwise the
/// previous part is entered `look_back` before its end, or at its start when
/// it is shorter than that or its length is unknown. The first part never
/// goes below its start.
pub fn rewind_target(part: u32, elapsed: f64, previous_duration: Option<f64>, look_back: f64) -> (u32, f64) {
    let index = part.max(1) - 1;

    if elapsed > look_back {
        (index, elapsed - look_back)
    } else if index > 0 {
        match previous_duration {
            Some(duration) if duration > look_back => (index - 1, duration - look_back),
            _ => (index - 1, 0.0),
        }
    } else {
        (0, 0.0)
    }
}

/// Whether a book has played to its end
///
/// The daemon stops by itself after the last queued item, so a stopped daemon
/// sitting on the last part within `tolerance` of its end means the book is
/// done. An unknown duration never counts as finished.
pub fn is_finished(
    state: DaemonState,
    part: u32,
    playlist_length: u32,
    duration: Option<f64>,
    elapsed: f64,
    tolerance: f64,
) -> bool {
    state == DaemonState::Stop
        && playlist_length > 0
        && part == playlist_length
        && duration.is_some_and(|d| d - elapsed < tolerance)
}

struct Inner {
    daemon: Box<dyn AudioDaemon>,
    session: PlaybackSession,
    parts: BookParts,
}

impl Inner {
    fn clear_session(&mut self) {
        self.session.reset();
        self.parts = BookParts::default();
    }
}

/// Play/pause/stop/seek/rewind/volume state machine for one reader
pub struct PlaybackController {
    inner: Mutex<Inner>,
    store: Arc<dyn ProgressStore>,
    settings: ControllerSettings,
    events: broadcast::Sender<PlayerEvent>,
}

impl PlaybackController {
    /// Create a controller with an empty session at `volume_percent`
    ///
    /// The volume is only recorded; call [`set_volume`](Self::set_volume) to
    /// push it to the daemon.
    pub fn new(
        daemon: Box<dyn AudioDaemon>,
        store: Arc<dyn ProgressStore>,
        settings: ControllerSettings,
        volume_percent: u8,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Mutex::new(Inner {
                daemon,
                session: PlaybackSession::new(volume_percent),
                parts: BookParts::default(),
            }),
            store,
            settings,
            events,
        }
    }

    /// Subscribe to controller events
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.events.subscribe()
    }

    /// Snapshot of the current session
    pub async fn session(&self) -> PlaybackSession {
        self.inner.lock().await.session.clone()
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    fn emit(&self, event: PlayerEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn report<T>(&self, operation: &'static str, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            warn!("{} failed: {}", operation, e);
            self.emit(PlayerEvent::Fault {
                operation,
                message: e.to_string(),
            });
        }
        result
    }

    /// Make `book_id` the current book and start playing it
    ///
    /// Resumes from saved progress when there is any. Nothing is persisted
    /// here; the next status tick records the position.
    pub async fn load_and_play(&self, book_id: &BookId) -> Result<LoadOutcome> {
        let mut inner = self.inner.lock().await;
        if inner.session.book_id() == Some(book_id) {
            debug!("Book {} already loaded", book_id);
            return Ok(LoadOutcome::AlreadyLoaded);
        }

        let result = self.load_locked(&mut inner, book_id).await;
        self.report("load_and_play", result)
    }

    async fn load_locked(&self, inner: &mut Inner, book_id: &BookId) -> Result<LoadOutcome> {
        info!("Loading book {}", book_id);

        // Before anything is stopped: a failed lookup leaves the current book playing
        let record = self.store.lookup(book_id).await?;

        if inner.daemon.status().await?.is_playing() {
            inner.daemon.stop().await?;
        }
        inner.clear_session();

        let parts = BookParts::from_search(book_id, inner.daemon.find_files(book_id).await?);
        if parts.is_empty() {
            warn!("No audio files found for book {}", book_id);
            self.emit(PlayerEvent::BookNotFound {
                book_id: book_id.clone(),
            });
            return Ok(LoadOutcome::BookNotFound);
        }

        let (part, elapsed, resumed) = match record {
            Some(r) if usize::try_from(r.part).is_ok_and(|p| p <= parts.len()) => (r.part, r.elapsed, true),
            Some(r) => {
                warn!(
                    "Ignoring saved progress of book {}: part {} but only {} parts",
                    book_id,
                    r.part,
                    parts.len()
                );
                (1, 0.0, false)
            }
            None => (1, 0.0, false),
        };

        inner.daemon.clear().await?;
        for file in parts.files() {
            inner.daemon.enqueue(&file.path).await?;
        }
        // Queued: the book is current from here on, at its start until the
        // daemon confirms the resume point
        inner.session.load(book_id.clone(), 1, 0.0);
        inner.parts = parts;

        if resumed {
            inner.daemon.seek(part - 1, elapsed).await?;
        } else {
            inner.daemon.play().await?;
        }
        inner.session.set_position(part, elapsed);

        info!(
            "Playing book {} ({} parts) from part {} at {:.1}s",
            book_id,
            inner.parts.len(),
            part,
            elapsed
        );
        self.emit(PlayerEvent::BookLoaded {
            book_id: book_id.clone(),
            part,
            elapsed,
            resumed,
        });

        Ok(LoadOutcome::Playing { part, elapsed, resumed })
    }

    /// Sync the session with the daemon, persist progress, detect the end
    ///
    /// Progress is written before completion is evaluated, so a finished
    /// book's record is always the one deleted. A failed progress write is
    /// logged and retried on the next tick.
    pub async fn on_status_tick(&self) -> Result<TickOutcome> {
        let mut inner = self.inner.lock().await;
        let Some(book_id) = inner.session.book_id().cloned() else {
            return Ok(TickOutcome::Idle);
        };

        let result = self.tick_locked(&mut inner, book_id).await;
        self.report("status_tick", result)
    }

    async fn tick_locked(&self, inner: &mut Inner, book_id: BookId) -> Result<TickOutcome> {
        let status = inner.daemon.status().await?;
        let mut persisted = false;

        if status.is_playing() {
            let part = status.song.map_or(inner.session.part(), |index| index + 1);
            let elapsed = status.elapsed.unwrap_or(0.0);
            inner.session.set_position(part, elapsed);

            if inner.parts.duration(part).is_none() {
                Self::fill_duration(inner, part).await;
            }

            match self.store.upsert(&book_id, part, elapsed).await {
                Ok(()) => persisted = true,
                Err(e) => warn!("Failed to save progress of book {}: {}", book_id, e),
            }
            debug!("Book {} part {} at {:.1}s", book_id, part, elapsed);
        }

        let part = inner.session.part();
        let elapsed = inner.session.elapsed();
        let finished = is_finished(
            status.state,
            part,
            status.playlist_length,
            inner.parts.duration(part),
            elapsed,
            self.settings.finish_tolerance_seconds,
        );

        if finished {
            // Keep the session on failure so the next tick retries the delete
            self.store.delete(&book_id).await?;
            inner.clear_session();

            info!("Finished book {}", book_id);
            self.emit(PlayerEvent::BookFinished {
                book_id: book_id.clone(),
            });
            return Ok(TickOutcome::Finished { book_id });
        }

        Ok(TickOutcome::Progress {
            part,
            elapsed,
            persisted,
        })
    }

    async fn fill_duration(inner: &mut Inner, part: u32) {
        match inner.daemon.current_item().await {
            Ok(Some(AudioFile {
                duration: Some(duration),
                ..
            })) => inner.parts.set_duration(part, duration),
            Ok(_) => {}
            Err(e) => debug!("No duration for part {}: {}", part, e),
        }
    }

    /// Pause when playing, resume when paused
    pub async fn toggle_pause(&self) -> Result<PauseOutcome> {
        let mut inner = self.inner.lock().await;
        let result = Self::toggle_locked(&mut inner).await;

        match &result {
            Ok(PauseOutcome::Paused) => self.emit(PlayerEvent::Paused),
            Ok(PauseOutcome::Resumed) => self.emit(PlayerEvent::Resumed),
            Ok(PauseOutcome::Invalid) => {
                debug!("Nothing to pause or resume");
                self.emit(PlayerEvent::InvalidOperation {
                    operation: "toggle_pause",
                });
            }
            Err(_) => {}
        }
        self.report("toggle_pause", result)
    }

    async fn toggle_locked(inner: &mut Inner) -> Result<PauseOutcome> {
        match inner.daemon.status().await?.state {
            DaemonState::Play => {
                inner.daemon.pause().await?;
                info!("Paused");
                Ok(PauseOutcome::Paused)
            }
            DaemonState::Pause => {
                inner.daemon.play().await?;
                info!("Resumed");
                Ok(PauseOutcome::Resumed)
            }
            DaemonState::Stop => Ok(PauseOutcome::Invalid),
        }
    }

    /// Jump back by the configured look-back; no-op unless playing
    ///
    /// Returns the new (1-based part, seconds) position.
    pub async fn rewind(&self) -> Result<Option<(u32, f64)>> {
        let mut inner = self.inner.lock().await;
        let result = self.rewind_locked(&mut inner).await;
        self.report("rewind", result)
    }

    async fn rewind_locked(&self, inner: &mut Inner) -> Result<Option<(u32, f64)>> {
        let status = inner.daemon.status().await?;
        if !status.is_playing() {
            debug!("Rewind ignored, not playing");
            return Ok(None);
        }

        let part = status.song.map_or(inner.session.part(), |index| index + 1);
        let elapsed = status.elapsed.unwrap_or_else(|| inner.session.elapsed());
        let previous = inner.parts.duration(part.saturating_sub(1));
        let (index, seconds) = rewind_target(part, elapsed, previous, self.settings.rewind_seconds);

        inner.daemon.seek(index, seconds).await?;
        inner.session.set_position(index + 1, seconds);

        info!("Rewound to part {} at {:.1}s", index + 1, seconds);
        self.emit(PlayerEvent::Rewound {
            part: index + 1,
            elapsed: seconds,
        });
        Ok(Some((index + 1, seconds)))
    }

    /// Raise the volume by one step, up to 100
    pub async fn volume_up(&self) -> Result<u8> {
        self.step_volume(i16::from(self.settings.volume_step)).await
    }

    /// Lower the volume by one step, down to 0
    pub async fn volume_down(&self) -> Result<u8> {
        self.step_volume(-i16::from(self.settings.volume_step)).await
    }

    async fn step_volume(&self, delta: i16) -> Result<u8> {
        let mut inner = self.inner.lock().await;
        let target = (i16::from(inner.session.volume_percent()) + delta).clamp(0, 100) as u8;
        let result = self.volume_locked(&mut inner, target).await;
        self.report("set_volume", result)
    }

    /// Set an absolute volume (clamped to 100) on the daemon and the session
    pub async fn set_volume(&self, percent: u8) -> Result<u8> {
        let mut inner = self.inner.lock().await;
        let result = self.volume_locked(&mut inner, percent.min(100)).await;
        self.report("set_volume", result)
    }

    async fn volume_locked(&self, inner: &mut Inner, percent: u8) -> Result<u8> {
        inner.daemon.set_volume(percent).await?;
        inner.session.set_volume_percent(percent);

        info!("Volume set to {}%", percent);
        self.emit(PlayerEvent::VolumeChanged { percent });
        Ok(percent)
    }

    /// Stop playback, empty the daemon queue, then clear the session
    ///
    /// Idempotent. When the daemon fails the session is left as it was.
    pub async fn stop(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let result = self.stop_locked(&mut inner).await;
        self.report("stop", result)
    }

    async fn stop_locked(&self, inner: &mut Inner) -> Result<()> {
        inner.daemon.stop().await?;
        inner.daemon.clear().await?;

        if let Some(book_id) = inner.session.book_id() {
            info!("Stopped book {}", book_id);
            inner.clear_session();
            self.emit(PlayerEvent::Stopped);
        }
        Ok(())
    }

    /// Stop, then release the daemon connection
    pub async fn close(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if let Err(e) = self.stop_locked(&mut inner).await {
            warn!("Failed to stop playback while closing: {}", e);
        }
        inner.daemon.disconnect().await?;
        info!("Playback controller closed");
        Ok(())
    }
}
