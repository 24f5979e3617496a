//! Status light loop
//!
//! A free-running task steps through the current base pattern forever. Any
//! caller may push an interrupt overlay at any time; queued overlay states
//! are shown before the base pattern resumes, which then starts again from
//! its first state.
//!
//! The overlay queue and base pattern sit behind a lock of their own, held
//! only for a push or pop and never across a sleep, so callers never wait on
//! the loop's timing and the loop never waits on playback.

use super::patterns::PatternName;
use super::pin::IndicatorPin;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

#[derive(Debug)]
struct LightState {
    base: PatternName,
    overlay: VecDeque<bool>,
    overlay_interval: Duration,
}

#[derive(Debug)]
struct Shared {
    state: Mutex<LightState>,
    exit: AtomicBool,
}

/// Handle to the status light
///
/// Cheap to clone; all clones drive the same light.
#[derive(Debug, Clone)]
pub struct StatusLight {
    shared: Arc<Shared>,
}

impl StatusLight {
    pub fn new(base: PatternName) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(LightState {
                    base,
                    overlay: VecDeque::new(),
                    overlay_interval: PatternName::BlinkFast.pattern().interval,
                }),
                exit: AtomicBool::new(false),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LightState> {
        // A panic while holding this lock cannot leave the queue half-updated
        self.shared
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Switch the steady-state pattern
    pub fn set_base(&self, name: PatternName) {
        let mut state = self.lock();
        if state.base != name {
            debug!("Status light base pattern: {} -> {}", state.base, name);
            state.base = name;
        }
    }

    pub fn base(&self) -> PatternName {
        self.lock().base
    }

    /// Queue `repeat` runs of a pattern ahead of the base pattern
    ///
    /// Appends to whatever is already queued; the pattern's interval becomes
    /// the drain interval for the whole queue.
    pub fn interrupt(&self, name: PatternName, repeat: usize) {
        let pattern = name.pattern();
        let mut state = self.lock();
        state.overlay_interval = pattern.interval;
        for _ in 0..repeat {
            state.overlay.extend(pattern.states.iter().copied());
        }
    }

    /// States still waiting in the overlay queue
    pub fn pending_overlay(&self) -> Vec<bool> {
        self.lock().overlay.iter().copied().collect()
    }

    /// Ask the loop to stop; it exits at the next state boundary
    pub fn request_exit(&self) {
        self.shared.exit.store(true, Ordering::SeqCst);
    }

    pub fn exit_requested(&self) -> bool {
        self.shared.exit.load(Ordering::SeqCst)
    }

    fn pop_overlay(&self) -> Option<(bool, Duration)> {
        let mut state = self.lock();
        let interval = state.overlay_interval;
        state.overlay.pop_front().map(|s| (s, interval))
    }

    fn show(&self, pin: &mut dyn IndicatorPin, on: bool) {
        if let Err(e) = pin.set(on) {
            warn!("Failed to set status light: {}", e);
        }
    }

    /// Drive `pin` until [`request_exit`](Self::request_exit) is called
    ///
    /// The pin is released before returning.
    pub async fn run<P: IndicatorPin>(&self, mut pin: P) {
        info!("Status light loop started");

        'cycle: loop {
            if self.exit_requested() {
                break;
            }

            if let Some((on, interval)) = self.pop_overlay() {
                self.show(&mut pin, on);
                sleep(interval).await;
                continue;
            }

            let pattern = self.base().pattern();
            for &on in pattern.states {
                if self.exit_requested() {
                    break 'cycle;
                }
                self.show(&mut pin, on);
                sleep(pattern.interval).await;
            }
        }

        if let Err(e) = pin.release() {
            warn!("Failed to release status light: {}", e);
        }
        info!("Status light loop stopped");
    }

    /// Run the loop on its own task
    pub fn spawn<P: IndicatorPin + 'static>(&self, pin: P) -> JoinHandle<()> {
        let light = self.clone();
        tokio::spawn(async move { light.run(pin).await })
    }
}
