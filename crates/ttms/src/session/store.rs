//! Key/value storage for the local session.
//!
//! The dashboard keeps two entries: the session blob and the last-activity
//! timestamp. Anything that can hold strings by key can back it.

use crate::error::TtmsError;
use dashmap::DashMap;
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

const SCHEMA_SQL: &str = include_str!("../../../../sql/init_storage.sql");

/// Storage for session entries.
pub trait SessionStore: Send + Sync {
    /// Reads the value stored under `key`.
    fn get(&self, key: &str) -> Result<Option<String>, TtmsError>;

    /// Writes `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), TtmsError>;

    /// Removes `key`. Removing a missing key is not an error.
    fn clear(&self, key: &str) -> Result<(), TtmsError>;
}

/// In-process store, lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, TtmsError> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), TtmsError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn clear(&self, key: &str) -> Result<(), TtmsError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// SQLite-backed store so a session survives between CLI invocations.
pub struct SqliteStore {
    db: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (or creates) the store at `path` and initializes the schema.
    pub fn open(path: &Path) -> Result<Self, TtmsError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA_SQL)?;
        debug!("Opened session store at {}", path.display());

        Ok(Self {
            db: Mutex::new(conn),
        })
    }

    /// Opens a private in-memory database.
    pub fn in_memory() -> Result<Self, TtmsError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            db: Mutex::new(conn),
        })
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> Result<T, TtmsError> {
        let db = self.db.lock().map_err(|_| TtmsError::Storage {
            message: "session store lock poisoned".to_string(),
        })?;
        Ok(f(&db)?)
    }
}

impl SessionStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, TtmsError> {
        self.with_conn(|db| {
            db.query_row(
                "SELECT value FROM session_entries WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()
        })
    }

    fn set(&self, key: &str, value: &str) -> Result<(), TtmsError> {
        self.with_conn(|db| {
            db.execute(
                "INSERT INTO session_entries (key, value, updated_at)
                 VALUES (?1, ?2, datetime('now'))
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                                                updated_at = excluded.updated_at",
                (key, value),
            )
        })?;
        Ok(())
    }

    fn clear(&self, key: &str) -> Result<(), TtmsError> {
        self.with_conn(|db| db.execute("DELETE FROM session_entries WHERE key = ?1", [key]))?;
        Ok(())
    }
}
