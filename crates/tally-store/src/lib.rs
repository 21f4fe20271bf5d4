//! Tally Storage Layer
//!
//! Implements the `TranscriptCache` trait over SQLite. The cache is what
//! makes a batch resumable: each page's transcription is persisted under its
//! `(doc_id, page_id)` key, so a re-run never pays for a model call twice.
//!
//! # Architecture
//!
//! - SQLite for transcription blobs keyed by page
//! - `PageCache` wrapper providing the idempotent get-or-compute contract
//!
//! # Examples
//!
//! ```no_run
//! use tally_store::SqliteTranscriptStore;
//!
//! let store = SqliteTranscriptStore::new("transcripts.db").unwrap();
//! // Store is now ready for cache operations
//! ```

#![warn(missing_docs)]

mod cache;

pub use cache::PageCache;

use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use tally_domain::traits::TranscriptCache;
use tally_domain::PageKey;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Invalid data format
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// SQLite-backed implementation of `TranscriptCache`
///
/// A single database file holds every page transcription for a batch and
/// survives process restarts. The `(doc_id, page_id)` primary key enforces
/// the at-most-one-entry-per-page invariant at the storage layer.
///
/// # Thread Safety
///
/// SQLite connections are not thread-safe. Each thread should have its own
/// store instance, or writes must be serialized by the caller.
pub struct SqliteTranscriptStore {
    conn: Connection,
}

impl SqliteTranscriptStore {
    /// Open (or create) a transcript store at the given path
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use tally_store::SqliteTranscriptStore;
    ///
    /// let store = SqliteTranscriptStore::new("transcripts.db").unwrap();
    /// ```
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Open an in-memory store (useful for testing)
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::new(":memory:")
    }

    /// Initialize the database schema
    fn initialize_schema(&self) -> Result<(), StoreError> {
        let schema = include_str!("schema.sql");
        self.conn.execute_batch(schema)?;
        Ok(())
    }

    /// Number of cached transcriptions
    pub fn len(&self) -> Result<usize, StoreError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM transcripts", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// True when no transcriptions are cached
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    /// Flush pending writes to disk
    ///
    /// SQLite commits each statement on its own; this forces a WAL
    /// checkpoint for stores opened in WAL mode and is a no-op otherwise.
    pub fn flush(&self) -> Result<(), StoreError> {
        // wal_checkpoint reports a status row in every journal mode
        self.conn
            .query_row("PRAGMA wal_checkpoint(PASSIVE)", [], |_| Ok(()))?;
        Ok(())
    }

    /// Close the store, flushing first
    pub fn close(self) -> Result<(), StoreError> {
        self.flush()?;
        self.conn
            .close()
            .map_err(|(_, e)| StoreError::Database(e))?;
        Ok(())
    }
}

impl TranscriptCache for SqliteTranscriptStore {
    type Error = StoreError;

    fn get(&self, key: &PageKey) -> Result<Option<String>, Self::Error> {
        let content = self
            .conn
            .query_row(
                "SELECT content FROM transcripts WHERE doc_id = ?1 AND page_id = ?2",
                params![&key.doc_id, key.page_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(content)
    }

    fn put(&mut self, key: &PageKey, text: &str) -> Result<(), Self::Error> {
        self.conn.execute(
            "INSERT INTO transcripts (doc_id, page_id, content)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (doc_id, page_id)
             DO UPDATE SET content = excluded.content,
                           created_at = strftime('%s', 'now')",
            params![&key.doc_id, key.page_id, text],
        )?;
        Ok(())
    }

    fn remove(&mut self, key: &PageKey) -> Result<(), Self::Error> {
        self.conn.execute(
            "DELETE FROM transcripts WHERE doc_id = ?1 AND page_id = ?2",
            params![&key.doc_id, key.page_id],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_initialization() {
        let store = SqliteTranscriptStore::in_memory();
        assert!(store.is_ok());
    }

    #[test]
    fn test_put_and_get() {
        let mut store = SqliteTranscriptStore::in_memory().unwrap();
        let key = PageKey::new("1704", 1);

        assert_eq!(store.get(&key).unwrap(), None);

        store.put(&key, "Received of Mr Hale  £3 12s 6d").unwrap();
        assert_eq!(
            store.get(&key).unwrap().as_deref(),
            Some("Received of Mr Hale  £3 12s 6d")
        );
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn test_put_replaces_existing_entry() {
        let mut store = SqliteTranscriptStore::in_memory().unwrap();
        let key = PageKey::new("1704", 1);

        store.put(&key, "first pass").unwrap();
        store.put(&key, "second pass").unwrap();

        assert_eq!(store.get(&key).unwrap().as_deref(), Some("second pass"));
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn test_keys_are_independent() {
        let mut store = SqliteTranscriptStore::in_memory().unwrap();
        store.put(&PageKey::new("1704", 1), "page one").unwrap();
        store.put(&PageKey::new("1704", 2), "page two").unwrap();
        store.put(&PageKey::new("1712", 1), "other year").unwrap();

        assert_eq!(store.len().unwrap(), 3);
        assert_eq!(
            store.get(&PageKey::new("1704", 2)).unwrap().as_deref(),
            Some("page two")
        );
    }

    #[test]
    fn test_remove() {
        let mut store = SqliteTranscriptStore::in_memory().unwrap();
        let key = PageKey::new("1704", 1);
        store.put(&key, "text").unwrap();
        store.remove(&key).unwrap();
        assert_eq!(store.get(&key).unwrap(), None);
        assert!(store.is_empty().unwrap());
    }
}
