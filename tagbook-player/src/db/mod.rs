//! Database access layer
//!
//! Provides the progress store and device settings.

pub mod progress;
pub mod settings;

pub use progress::{ProgressRecord, ProgressStore, SqliteProgressStore};
