//! Main poll loop
//!
//! Once per cycle: let the controller sync with the daemon, then read the tag
//! on the reader and switch to its book if it differs from the current one.
//! A book that just finished stays on the reader without restarting; it
//! plays again only after its tag has been taken off and put back. A tag
//! with no matching files is not looked up again until it is taken off.

use crate::input::TagSource;
use crate::playback::{LoadOutcome, PlaybackController, TickOutcome};
use crate::types::BookId;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub struct PollLoop<T: TagSource> {
    controller: Arc<PlaybackController>,
    tags: T,
    period: Duration,
    finished: Option<BookId>,
    unknown: Option<BookId>,
}

impl<T: TagSource> PollLoop<T> {
    pub fn new(controller: Arc<PlaybackController>, tags: T, period: Duration) -> Self {
        Self {
            controller,
            tags,
            period,
            finished: None,
            unknown: None,
        }
    }

    /// Book that finished and whose tag has not been removed since
    pub fn finished_book(&self) -> Option<&BookId> {
        self.finished.as_ref()
    }

    /// Tag on the reader that matched no files, until it is removed
    pub fn unknown_tag(&self) -> Option<&BookId> {
        self.unknown.as_ref()
    }

    /// Run one cycle
    ///
    /// Errors are logged and left for the next cycle; the controller has
    /// already announced them.
    pub async fn cycle(&mut self) {
        match self.controller.on_status_tick().await {
            Ok(TickOutcome::Finished { book_id }) => self.finished = Some(book_id),
            Ok(_) => {}
            Err(e) => debug!("Status tick skipped: {}", e),
        }

        match self.tags.read_tag().await {
            Ok(Some(book_id)) => {
                if self.finished.as_ref() == Some(&book_id)
                    || self.unknown.as_ref() == Some(&book_id)
                {
                    return;
                }
                self.finished = None;
                self.unknown = None;

                match self.controller.load_and_play(&book_id).await {
                    Ok(LoadOutcome::BookNotFound) => self.unknown = Some(book_id),
                    Ok(_) => {}
                    Err(e) => debug!("Book {} not loaded: {}", book_id, e),
                }
            }
            Ok(None) => {
                if let Some(book_id) = self.finished.take() {
                    debug!("Tag of finished book {} removed", book_id);
                }
                self.unknown = None;
            }
            Err(e) => warn!("Tag read failed: {}", e),
        }
    }

    /// Cycle every period until `shutdown` is cancelled
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!("Poll loop started ({:?} period)", self.period);

        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }
            self.cycle().await;
        }

        info!("Poll loop stopped");
    }
}
