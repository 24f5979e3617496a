//! Settings database access
//!
//! Read/write device-wide settings from the settings table (key-value store).

use crate::error::{Error, Result};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;

const VOLUME_KEY: &str = "volume_percent";

/// Get the last saved output volume (0-100)
///
/// Falls back to `default` (and stores it) when nothing was saved yet.
pub async fn get_volume(db: &Pool<Sqlite>, default: u8) -> Result<u8> {
    match get_setting::<u8>(db, VOLUME_KEY).await? {
        Some(volume) => Ok(volume.min(100)),
        None => {
            let default = default.min(100);
            set_volume(db, default).await?;
            Ok(default)
        }
    }
}

/// Save output volume (0-100)
pub async fn set_volume(db: &Pool<Sqlite>, volume: u8) -> Result<()> {
    set_setting(db, VOLUME_KEY, volume.min(100)).await
}

/// Generic setting getter
///
/// Returns `None` for missing keys and NULL values.
pub async fn get_setting<T: FromStr>(db: &Pool<Sqlite>, key: &str) -> Result<Option<T>> {
    let value: Option<Option<String>> =
        sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(db)
            .await?;

    match value.flatten() {
        Some(s) => match s.parse::<T>() {
            Ok(parsed) => Ok(Some(parsed)),
            Err(_) => Err(Error::Config(format!(
                "Failed to parse setting '{}' value: {}",
                key, s
            ))),
        },
        None => Ok(None),
    }
}

/// Generic setting setter
///
/// Inserts or updates setting in database.
pub async fn set_setting<T: ToString>(db: &Pool<Sqlite>, key: &str, value: T) -> Result<()> {
    let value_str = value.to_string();

    sqlx::query(
        r#"
        INSERT INTO settings (key, value, updated_at)
        VALUES (?, ?, CURRENT_TIMESTAMP)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(key)
    .bind(value_str)
    .execute(db)
    .await?;

    Ok(())
}
