//! Daily condition cache over a pluggable key-value store.
//!
//! Entries are keyed `weather_{YYYY-MM-DD}_{location}` and hold a condition
//! name. There is no expiry: once the date changes the key changes, and old
//! entries are simply never read again.

use chrono::Utc;
use hoenn_core::error::RusqliteErrorExt;
use hoenn_core::StorageError;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::day::DayKey;
use crate::types::Condition;

pub const KEY_PREFIX: &str = "weather_";

/// Synchronous string key-value storage
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Session-scoped store; contents vanish with the process
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Durable store backed by a single SQLite table
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StorageError::OpenFailed(e.to_string()))?;
        }
        let conn = Connection::open(path).map_err(|e| StorageError::OpenFailed(e.to_string()))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        tracing::debug!("Opened weather cache at {}", path.display());
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn =
            Connection::open_in_memory().map_err(|e| StorageError::OpenFailed(e.to_string()))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), StorageError> {
        self.conn
            .lock()
            .execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS kv (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL,
                    updated_at INTEGER NOT NULL
                );
                "#,
            )
            .map_err(RusqliteErrorExt::into_storage_error)
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.conn
            .lock()
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()
            .map_err(RusqliteErrorExt::into_storage_error)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let now = Utc::now().timestamp_millis();
        self.conn
            .lock()
            .execute(
                "INSERT OR REPLACE INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)",
                params![key, value, now],
            )
            .map(|_| ())
            .map_err(RusqliteErrorExt::into_storage_error)
    }
}

/// `(day, location) -> condition` memo. Store failures are logged and
/// treated as misses; they never reach the caller.
#[derive(Clone)]
pub struct DailyConditionCache {
    store: Arc<dyn KeyValueStore>,
}

impl DailyConditionCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Cache over a fresh [`MemoryStore`]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn key(day: &DayKey, location: &str) -> String {
        format!("{}{}_{}", KEY_PREFIX, day, location)
    }

    pub fn get(&self, day: &DayKey, location: &str) -> Option<Condition> {
        let key = Self::key(day, location);
        let raw = match self.store.get(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!("Weather cache read failed for {}: {}", key, e);
                return None;
            }
        };

        match raw.parse::<Condition>() {
            Ok(condition) => Some(condition),
            Err(e) => {
                tracing::warn!("Ignoring unreadable cache entry {}: {}", key, e);
                None
            }
        }
    }

    pub fn set(&self, day: &DayKey, location: &str, condition: Condition) {
        let key = Self::key(day, location);
        if let Err(e) = self.store.set(&key, condition.as_str()) {
            tracing::warn!("Weather cache write failed for {}: {}", key, e);
        }
    }
}

impl std::fmt::Debug for DailyConditionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DailyConditionCache").finish_non_exhaustive()
    }
}
