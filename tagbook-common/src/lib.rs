//! # tagbook Common Library
//!
//! Shared code for the tagbook audiobook reader:
//! - Error type shared by bootstrap code
//! - TOML bootstrap configuration and config file resolution
//! - SQLite database initialization (progress and settings tables)

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
