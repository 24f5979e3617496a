//! Event sources: the RFID reader and the hardware buttons

pub mod buttons;
pub mod rfid;

pub use buttons::{dispatch, spawn_button_poller, spawn_dispatcher, ButtonAction, Debouncer, SysfsButton};
pub use rfid::{SerialTagReader, TagFrame, TagSource};
