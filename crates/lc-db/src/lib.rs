//! Storage layer for the labor contraction counter.
//!
//! Provides a SQLite-backed [`KeyValueStore`] using `rusqlite`. The core only
//! ever stores a handful of JSON records, so the schema is a single table
//! mapping keys to values.
//!
//! # Thread Safety
//!
//! [`SqliteStorage`] wraps a `rusqlite::Connection`, which is `Send` but not
//! `Sync`. Move it to the thread that owns the tracker rather than sharing it.
//!
//! # Quota
//!
//! SQLite has no storage quota of its own. An optional byte budget can be
//! configured; writes that would push the stored keys and values past it fail
//! with [`StorageError::QuotaExceeded`], and [`KeyValueStore::estimate`]
//! reports usage against it.

use std::path::Path;

use chrono::{SecondsFormat, Utc};
use lc_core::{KeyValueStore, StorageError, StorageEstimate};
use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl From<DbError> for StorageError {
    fn from(err: DbError) -> Self {
        Self::Backend(err.to_string())
    }
}

/// A stored key with its size and last write time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRecord {
    pub key: String,
    pub bytes: u64,
    pub updated_at: String,
}

/// Key-value storage in a SQLite database.
pub struct SqliteStorage {
    conn: Connection,
    quota: Option<u64>,
}

impl SqliteStorage {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let storage = Self { conn, quota: None };
        storage.init()?;
        Ok(storage)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let storage = Self { conn, quota: None };
        storage.init()?;
        Ok(storage)
    }

    /// Sets the byte budget writes are checked against.
    #[must_use]
    pub fn with_quota(mut self, quota: Option<u64>) -> Self {
        self.quota = quota;
        self
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            -- kv: one JSON record per key
            -- updated_at: ISO 8601 (e.g., '2025-01-15T10:30:00Z')
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    pub fn read(&self, key: &str) -> Result<Option<String>, DbError> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    pub fn write(&self, key: &str, value: &str) -> Result<(), DbError> {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        self.conn.execute(
            "
            INSERT INTO kv (key, value, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            ",
            params![key, value, now],
        )?;
        Ok(())
    }

    pub fn delete(&self, key: &str) -> Result<(), DbError> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?", params![key])?;
        Ok(())
    }

    /// Lists stored keys ordered by key.
    pub fn keys(&self) -> Result<Vec<KeyRecord>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT key, length(CAST(key AS BLOB)) + length(CAST(value AS BLOB)), updated_at
            FROM kv
            ORDER BY key ASC
            ",
        )?;
        let rows = stmt.query_map([], |row| {
            let bytes: i64 = row.get(1)?;
            Ok(KeyRecord {
                key: row.get(0)?,
                bytes: u64::try_from(bytes).unwrap_or(0),
                updated_at: row.get(2)?,
            })
        })?;
        let mut keys = Vec::new();
        for row in rows {
            keys.push(row?);
        }
        Ok(keys)
    }

    /// Bytes held by every key except `excluding`.
    fn usage(&self, excluding: &str) -> Result<u64, DbError> {
        let usage: i64 = self.conn.query_row(
            "
            SELECT COALESCE(SUM(length(CAST(key AS BLOB)) + length(CAST(value AS BLOB))), 0)
            FROM kv
            WHERE key != ?
            ",
            params![excluding],
            |row| row.get(0),
        )?;
        Ok(u64::try_from(usage).unwrap_or(0))
    }
}

impl KeyValueStore for SqliteStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read(key)?)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        if let Some(quota) = self.quota {
            let needed = self.usage(key)? + (key.len() + value.len()) as u64;
            if needed > quota {
                tracing::debug!(key, needed, quota, "write rejected by quota");
                return Err(StorageError::QuotaExceeded { needed, quota });
            }
        }
        Ok(self.write(key, value)?)
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        Ok(self.delete(key)?)
    }

    fn estimate(&self) -> Result<Option<StorageEstimate>, StorageError> {
        let Some(quota) = self.quota else {
            return Ok(None);
        };
        Ok(Some(StorageEstimate {
            usage: self.usage("")?,
            quota,
        }))
    }
}
