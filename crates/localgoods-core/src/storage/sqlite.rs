//! `SQLite`-backed durable storage

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use rusqlite::{params, Connection, OptionalExtension};

use super::{migrations, KeyValueStorage, StorageResult};

/// Key-value storage persisted in a single `SQLite` table.
///
/// One connection per process; other processes writing the same file get
/// last-write-wins semantics per key.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Open a store at the given path, creating the file and parent directory
    ///
    /// Runs migrations automatically.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Open an in-memory store (useful for testing)
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StorageResult<Self> {
        Self::configure(&conn);
        migrations::run(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn configure(conn: &Connection) {
        // In-memory databases reject WAL; both pragmas are best effort
        if let Err(error) =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
                row.get::<_, String>(0)
            })
        {
            tracing::debug!("Could not enable WAL journal: {}", error);
        }
        if let Err(error) = conn.pragma_update(None, "synchronous", "NORMAL") {
            tracing::debug!("Could not set synchronous pragma: {}", error);
        }
    }

    fn connection(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyValueStorage for SqliteStorage {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        let value = self
            .connection()
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        let now = chrono::Utc::now().timestamp_millis();
        self.connection().execute(
            "INSERT OR REPLACE INTO kv_store (key, value, updated_at) VALUES (?, ?, ?)",
            params![key, value, now],
        )?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        self.connection()
            .execute("DELETE FROM kv_store WHERE key = ?", params![key])?;
        Ok(())
    }
}
