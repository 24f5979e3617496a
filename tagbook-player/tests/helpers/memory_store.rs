//! In-memory progress store

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tagbook_player::db::{ProgressRecord, ProgressStore};
use tagbook_player::{BookId, Error, Result};

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Arc<Mutex<HashMap<BookId, (u32, f64)>>>,
    fail_writes: Arc<AtomicBool>,
    fail_reads: Arc<AtomicBool>,
    writes: Arc<Mutex<Vec<(BookId, u32, f64)>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, book_id: BookId, part: u32, elapsed: f64) {
        self.records.lock().unwrap().insert(book_id, (part, elapsed));
    }

    pub fn get(&self, book_id: &BookId) -> Option<(u32, f64)> {
        self.records.lock().unwrap().get(book_id).copied()
    }

    /// Every successful upsert, in order
    pub fn writes(&self) -> Vec<(BookId, u32, f64)> {
        self.writes.lock().unwrap().clone()
    }

    /// Make upserts and deletes fail until switched back
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make lookups fail until switched back
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl ProgressStore for MemoryStore {
    async fn upsert(&self, book_id: &BookId, part: u32, elapsed: f64) -> Result<()> {
        self.check_writable()?;
        self.records
            .lock()
            .unwrap()
            .insert(book_id.clone(), (part, elapsed));
        self.writes
            .lock()
            .unwrap()
            .push((book_id.clone(), part, elapsed));
        Ok(())
    }

    async fn lookup(&self, book_id: &BookId) -> Result<Option<ProgressRecord>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(self.get(book_id).map(|(part, elapsed)| ProgressRecord {
            book_id: book_id.clone(),
            part,
            elapsed,
            updated_at: Utc::now(),
        }))
    }

    async fn delete(&self, book_id: &BookId) -> Result<()> {
        self.check_writable()?;
        self.records.lock().unwrap().remove(book_id);
        Ok(())
    }
}
