//! Listening progress persistence
//!
//! One row per book: the part being listened to and the seconds into it.
//! Rows are upserted on every status tick while a book plays and deleted
//! when the book is finished, so the next tag read starts it over.

use crate::error::Result;
use crate::types::BookId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Sqlite};

/// Saved position within a book
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressRecord {
    pub book_id: BookId,

    /// 1-based part index
    pub part: u32,

    /// Seconds into `part`
    pub elapsed: f64,

    /// When the row was last written
    pub updated_at: DateTime<Utc>,
}

/// Keyed progress storage
///
/// Each call is atomic on its own; callers never need transactions spanning
/// several calls.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Insert or replace the progress of a book (last write wins)
    async fn upsert(&self, book_id: &BookId, part: u32, elapsed: f64) -> Result<()>;

    async fn lookup(&self, book_id: &BookId) -> Result<Option<ProgressRecord>>;

    /// Forget a book's progress; deleting a missing row is not an error
    async fn delete(&self, book_id: &BookId) -> Result<()>;
}

/// [`ProgressStore`] backed by the SQLite `progress` table
#[derive(Debug, Clone)]
pub struct SqliteProgressStore {
    db: Pool<Sqlite>,
}

impl SqliteProgressStore {
    pub fn new(db: Pool<Sqlite>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProgressStore for SqliteProgressStore {
    async fn upsert(&self, book_id: &BookId, part: u32, elapsed: f64) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO progress (book_id, part, elapsed, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(book_id) DO UPDATE SET
                part = excluded.part,
                elapsed = excluded.elapsed,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(book_id.as_str())
        .bind(i64::from(part.max(1)))
        .bind(elapsed.max(0.0))
        .bind(Utc::now())
        .execute(&self.db)
        .await?;

        Ok(())
    }

    async fn lookup(&self, book_id: &BookId) -> Result<Option<ProgressRecord>> {
        let row: Option<(i64, f64, DateTime<Utc>)> = sqlx::query_as(
            "SELECT part, elapsed, updated_at FROM progress WHERE book_id = ?",
        )
        .bind(book_id.as_str())
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(|(part, elapsed, updated_at)| ProgressRecord {
            book_id: book_id.clone(),
            part: u32::try_from(part).unwrap_or(1).max(1),
            elapsed: elapsed.max(0.0),
            updated_at,
        }))
    }

    async fn delete(&self, book_id: &BookId) -> Result<()> {
        sqlx::query("DELETE FROM progress WHERE book_id = ?")
            .bind(book_id.as_str())
            .execute(&self.db)
            .await?;

        Ok(())
    }
}
