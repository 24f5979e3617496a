//! Controller event observers
//!
//! Background tasks that follow the controller's event stream: one keeps
//! the status light in step with playback, one remembers the volume across
//! restarts.

use crate::db::settings;
use crate::playback::PlayerEvent;
use crate::status_light::{PatternName, StatusLight};
use sqlx::{Pool, Sqlite};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Fast blinks shown for a failure or a button acknowledgement
const FEEDBACK_REPEAT: usize = 3;

/// How the light reacts to an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightReaction {
    Base(PatternName),
    Interrupt(PatternName, usize),
}

/// Light reaction for a controller event
pub fn light_reaction(event: &PlayerEvent) -> LightReaction {
    match event {
        PlayerEvent::BookLoaded { .. } | PlayerEvent::Resumed => LightReaction::Base(PatternName::Blink),
        PlayerEvent::Paused => LightReaction::Base(PatternName::BlinkPause),
        PlayerEvent::Stopped | PlayerEvent::BookFinished { .. } => LightReaction::Base(PatternName::On),
        PlayerEvent::BookNotFound { .. }
        | PlayerEvent::InvalidOperation { .. }
        | PlayerEvent::Fault { .. }
        | PlayerEvent::Rewound { .. }
        | PlayerEvent::VolumeChanged { .. } => {
            LightReaction::Interrupt(PatternName::BlinkFast, FEEDBACK_REPEAT)
        }
    }
}

/// Receive until the channel closes; lagging only skips events
async fn next_event(events: &mut broadcast::Receiver<PlayerEvent>) -> Option<PlayerEvent> {
    loop {
        match events.recv().await {
            Ok(event) => return Some(event),
            Err(RecvError::Lagged(skipped)) => warn!("Observer skipped {} controller events", skipped),
            Err(RecvError::Closed) => return None,
        }
    }
}

/// Drive the status light from controller events
pub fn spawn_light_observer(
    mut events: broadcast::Receiver<PlayerEvent>,
    light: StatusLight,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = next_event(&mut events).await {
            match light_reaction(&event) {
                LightReaction::Base(name) => light.set_base(name),
                LightReaction::Interrupt(name, repeat) => light.interrupt(name, repeat),
            }
        }
        debug!("Light observer stopped");
    })
}

/// Save every volume change to the settings table
pub fn spawn_volume_persister(
    mut events: broadcast::Receiver<PlayerEvent>,
    db: Pool<Sqlite>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = next_event(&mut events).await {
            if let PlayerEvent::VolumeChanged { percent } = event {
                if let Err(e) = settings::set_volume(&db, percent).await {
                    warn!("Failed to save volume: {}", e);
                }
            }
        }
        debug!("Volume persister stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BookId;

    #[test]
    fn test_playback_states_set_base_pattern() {
        let loaded = PlayerEvent::BookLoaded {
            book_id: BookId::from(1),
            part: 1,
            elapsed: 0.0,
            resumed: false,
        };
        assert_eq!(light_reaction(&loaded), LightReaction::Base(PatternName::Blink));
        assert_eq!(light_reaction(&PlayerEvent::Paused), LightReaction::Base(PatternName::BlinkPause));
        assert_eq!(light_reaction(&PlayerEvent::Resumed), LightReaction::Base(PatternName::Blink));
        assert_eq!(light_reaction(&PlayerEvent::Stopped), LightReaction::Base(PatternName::On));
        assert_eq!(
            light_reaction(&PlayerEvent::BookFinished { book_id: BookId::from(1) }),
            LightReaction::Base(PatternName::On)
        );
    }

    #[test]
    fn test_failures_and_buttons_interrupt() {
        let fast = LightReaction::Interrupt(PatternName::BlinkFast, 3);
        assert_eq!(light_reaction(&PlayerEvent::BookNotFound { book_id: BookId::from(2) }), fast);
        assert_eq!(light_reaction(&PlayerEvent::VolumeChanged { percent: 40 }), fast);
        assert_eq!(light_reaction(&PlayerEvent::Rewound { part: 1, elapsed: 0.0 }), fast);
        assert_eq!(
            light_reaction(&PlayerEvent::Fault {
                operation: "status_tick",
                message: "timeout".to_string()
            }),
            fast
        );
    }

    #[tokio::test]
    async fn test_light_observer_follows_events() {
        let (tx, rx) = broadcast::channel(8);
        let light = StatusLight::new(PatternName::On);
        let handle = spawn_light_observer(rx, light.clone());

        tx.send(PlayerEvent::Paused).unwrap();
        tx.send(PlayerEvent::VolumeChanged { percent: 10 }).unwrap();
        drop(tx);
        handle.await.unwrap();

        assert_eq!(light.base(), PatternName::BlinkPause);
        assert_eq!(light.pending_overlay().len(), 6);
    }
}
