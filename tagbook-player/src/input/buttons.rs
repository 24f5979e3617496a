//! Hardware buttons
//!
//! Each button is a sysfs GPIO input with a pull-up, so a press is a falling
//! edge. Pollers turn accepted presses into [`ButtonAction`] messages on a
//! channel; a single dispatcher task applies them to the controller, so
//! button handling shares the controller's lock with the poll loop.

use crate::error::{Error, Result};
use crate::gpio::{self, Direction};
use crate::playback::PlaybackController;
use serde::Deserialize;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// What a button does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonAction {
    Rewind,
    TogglePause,
    VolumeUp,
    VolumeDown,
}

impl ButtonAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ButtonAction::Rewind => "rewind",
            ButtonAction::TogglePause => "toggle_pause",
            ButtonAction::VolumeUp => "volume_up",
            ButtonAction::VolumeDown => "volume_down",
        }
    }
}

impl fmt::Display for ButtonAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ButtonAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "rewind" => Ok(ButtonAction::Rewind),
            "toggle_pause" => Ok(ButtonAction::TogglePause),
            "volume_up" => Ok(ButtonAction::VolumeUp),
            "volume_down" => Ok(ButtonAction::VolumeDown),
            other => Err(Error::Config(format!("unknown button action '{}'", other))),
        }
    }
}

/// Apply one button action to the controller
pub async fn dispatch(controller: &PlaybackController, action: ButtonAction) -> Result<()> {
    debug!("Button: {}", action);
    match action {
        ButtonAction::Rewind => controller.rewind().await.map(|_| ()),
        ButtonAction::TogglePause => controller.toggle_pause().await.map(|_| ()),
        ButtonAction::VolumeUp => controller.volume_up().await.map(|_| ()),
        ButtonAction::VolumeDown => controller.volume_down().await.map(|_| ()),
    }
}

/// Apply queued button actions until every sender is gone
pub fn spawn_dispatcher(
    controller: Arc<PlaybackController>,
    mut actions: mpsc::Receiver<ButtonAction>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(action) = actions.recv().await {
            // Failures were already reported as controller events
            if let Err(e) = dispatch(&controller, action).await {
                debug!("Button {} not applied: {}", action, e);
            }
        }
        debug!("Button dispatcher stopped");
    })
}

/// Drops presses that follow an accepted one too closely
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    last: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    /// Whether a press at `now` counts
    pub fn accept(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.duration_since(last) < self.window => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

/// A push button on a sysfs GPIO input
#[derive(Debug)]
pub struct SysfsButton {
    root: PathBuf,
    pin: u32,
    action: ButtonAction,
    value_path: PathBuf,
    last_level: bool,
    debouncer: Debouncer,
}

impl SysfsButton {
    pub fn open(root: &Path, pin: u32, action: ButtonAction, debounce: Duration) -> io::Result<Self> {
        let value_path = gpio::export(root, pin, Direction::In)?;
        let last_level = gpio::read_level(&value_path).unwrap_or(true);
        info!("Button {} on GPIO {}", action, pin);
        Ok(Self {
            root: root.to_path_buf(),
            pin,
            action,
            value_path,
            last_level,
            debouncer: Debouncer::new(debounce),
        })
    }

    pub fn pin(&self) -> u32 {
        self.pin
    }

    pub fn action(&self) -> ButtonAction {
        self.action
    }

    /// Sample the pin; returns the action on an accepted falling edge
    pub fn poll(&mut self, now: Instant) -> io::Result<Option<ButtonAction>> {
        let level = gpio::read_level(&self.value_path)?;
        let falling = self.last_level && !level;
        self.last_level = level;

        if falling && self.debouncer.accept(now) {
            Ok(Some(self.action))
        } else {
            Ok(None)
        }
    }

    /// Give the pin back to the kernel
    pub fn release(&self) -> io::Result<()> {
        gpio::unexport(&self.root, self.pin)
    }
}

/// Sample a button every `period` until cancelled, posting presses to `tx`
pub fn spawn_button_poller(
    mut button: SysfsButton,
    period: Duration,
    tx: mpsc::Sender<ButtonAction>,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut read_failed = false;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            match button.poll(Instant::now()) {
                Ok(Some(action)) => {
                    if tx.send(action).await.is_err() {
                        break;
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    // Log once per failure streak
                    if !read_failed {
                        warn!("Failed to read button on GPIO {}: {}", button.pin(), e);
                    }
                    read_failed = true;
                    continue;
                }
            }
            read_failed = false;
        }

        if let Err(e) = button.release() {
            debug!("Failed to release GPIO {}: {}", button.pin(), e);
        }
        debug!("Button poller on GPIO {} stopped", button.pin());
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_names_round_trip() {
        for action in [
            ButtonAction::Rewind,
            ButtonAction::TogglePause,
            ButtonAction::VolumeUp,
            ButtonAction::VolumeDown,
        ] {
            assert_eq!(action.as_str().parse::<ButtonAction>().unwrap(), action);
        }
        assert!(matches!("eject".parse::<ButtonAction>(), Err(Error::Config(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_debouncer_window() {
        let mut debouncer = Debouncer::new(Duration::from_millis(200));
        let start = Instant::now();

        assert!(debouncer.accept(start));
        assert!(!debouncer.accept(start + Duration::from_millis(150)));
        assert!(debouncer.accept(start + Duration::from_millis(200)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_button_reports_falling_edges_only() {
        let root = tempfile::TempDir::new().unwrap();
        std::fs::create_dir(root.path().join("gpio9")).unwrap();
        let value = root.path().join("gpio9").join("value");
        std::fs::write(&value, "1").unwrap();

        let mut button =
            SysfsButton::open(root.path(), 9, ButtonAction::Rewind, Duration::from_millis(200)).unwrap();
        let start = Instant::now();

        assert_eq!(button.poll(start).unwrap(), None);

        std::fs::write(&value, "0").unwrap();
        assert_eq!(button.poll(start).unwrap(), Some(ButtonAction::Rewind));
        // Held down: no new edge
        assert_eq!(button.poll(start + Duration::from_millis(100)).unwrap(), None);

        // Bounce inside the window
        std::fs::write(&value, "1").unwrap();
        button.poll(start + Duration::from_millis(150)).unwrap();
        std::fs::write(&value, "0").unwrap();
        assert_eq!(button.poll(start + Duration::from_millis(160)).unwrap(), None);

        std::fs::write(&value, "1").unwrap();
        button.poll(start + Duration::from_millis(400)).unwrap();
        std::fs::write(&value, "0").unwrap();
        assert_eq!(
            button.poll(start + Duration::from_millis(500)).unwrap(),
            Some(ButtonAction::Rewind)
        );
    }
}
