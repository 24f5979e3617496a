//! Playback session state machine

pub mod controller;
pub mod events;
pub mod parts;
pub mod session;

pub use controller::{
    is_finished, rewind_target, ControllerSettings, LoadOutcome, PauseOutcome, PlaybackController,
    TickOutcome,
};
pub use events::PlayerEvent;
pub use parts::BookParts;
pub use session::PlaybackSession;
