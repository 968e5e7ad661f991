//! Versioned key-value documents
//!
//! Every collection lives as one JSON array under one key. Each key carries
//! a version counter; writes name the version they were based on and are
//! refused when somebody else wrote in between.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use super::parse::{timestamp_column, OptionalRow};
use crate::error::{Error, Result};

/// A stored document with its concurrency token
#[derive(Debug, Clone)]
pub struct KvEntry {
    pub key: String,
    pub value: String,
    pub version: i64,
    pub updated_at: DateTime<Utc>,
}

/// A decoded collection plus the version it was read at
///
/// `version` is `None` when the key has never been written.
#[derive(Debug, Clone)]
pub struct Snapshot<T> {
    pub items: Vec<T>,
    pub version: Option<i64>,
}

/// What a read-modify-write closure wants done with the collection
pub enum Change<R> {
    /// Persist the modified collection and return the value
    Write(R),
    /// Discard any modification and return the value
    Keep(R),
}

pub struct KvStore<'a> {
    conn: &'a Connection,
}

impl<'a> KvStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Fetch a raw entry
    pub fn get(&self, key: &str) -> Result<Option<KvEntry>> {
        let entry = self
            .conn
            .query_row(
                "SELECT key, value, version, updated_at FROM kv_store WHERE key = ?1",
                params![key],
                |row| {
                    Ok(KvEntry {
                        key: row.get(0)?,
                        value: row.get(1)?,
                        version: row.get(2)?,
                        updated_at: timestamp_column(row, 3)?,
                    })
                },
            )
            .optional()?;
        Ok(entry)
    }

    /// Current version of a key, `None` if absent
    pub fn version(&self, key: &str) -> Result<Option<i64>> {
        let version = self
            .conn
            .query_row(
                "SELECT version FROM kv_store WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(version)
    }

    /// Write a value if the stored version still equals `expected`
    ///
    /// `expected = None` means the key must not exist yet. Returns the new
    /// version.
    #[instrument(skip(self, value))]
    pub fn put(&self, key: &str, value: &str, expected: Option<i64>) -> Result<i64> {
        let now = Utc::now().to_rfc3339();

        let changed = match expected {
            None => self.conn.execute(
                "INSERT INTO kv_store (key, value, version, updated_at) VALUES (?1, ?2, 1, ?3)
                 ON CONFLICT(key) DO NOTHING",
                params![key, value, now],
            )?,
            Some(version) => self.conn.execute(
                "UPDATE kv_store SET value = ?2, version = version + 1, updated_at = ?3
                 WHERE key = ?1 AND version = ?4",
                params![key, value, now, version],
            )?,
        };

        if changed == 0 {
            let found = self.version(key)?;
            warn!(key, ?expected, ?found, "Rejected stale write");
            return Err(Error::Conflict {
                key: key.to_string(),
                expected,
                found,
            });
        }

        let next = expected.map_or(1, |v| v + 1);
        debug!(key, version = next, "Stored document");
        Ok(next)
    }

    /// Delete a key regardless of version
    pub fn remove(&self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM kv_store WHERE key = ?1", params![key])?;
        Ok(())
    }

    /// All stored keys, sorted
    pub fn keys(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT key FROM kv_store ORDER BY key")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(keys)
    }

    /// Decode the collection under `key`; a missing key is an empty collection
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Snapshot<T>> {
        match self.get(key)? {
            Some(entry) => Ok(Snapshot {
                items: serde_json::from_str(&entry.value)?,
                version: Some(entry.version),
            }),
            None => Ok(Snapshot {
                items: Vec::new(),
                version: None,
            }),
        }
    }

    /// Encode and store a whole collection against the version it was read at
    pub fn save<T: Serialize>(&self, key: &str, items: &[T], expected: Option<i64>) -> Result<i64> {
        let value = serde_json::to_string(items)?;
        self.put(key, &value, expected)
    }

    /// Full read-modify-write of one collection inside one transaction
    ///
    /// The version check still guards against writers that bypass `modify`.
    pub fn modify<T, R, F>(&self, key: &str, f: F) -> Result<R>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut Vec<T>) -> Change<R>,
    {
        let tx = self.conn.unchecked_transaction()?;
        let Snapshot { mut items, version } = self.load::<T>(key)?;
        let result = match f(&mut items) {
            Change::Write(result) => {
                self.save(key, &items, version)?;
                result
            }
            Change::Keep(result) => result,
        };
        tx.commit()?;
        Ok(result)
    }
}
