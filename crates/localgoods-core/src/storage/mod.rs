//! Durable on-device key-value storage.
//!
//! The Local Store only needs a synchronous, string-keyed `getItem` /
//! `setItem` / `removeItem` surface. `MemoryStorage` backs tests and
//! ephemeral sessions; `SqliteStorage` is the durable backend.

mod memory;
mod migrations;
mod sqlite;

use thiserror::Error;

pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;

/// Errors raised by a storage backend
#[derive(Debug, Error)]
pub enum StorageError {
    /// The write would exceed the backend's capacity
    #[error("Storage quota exceeded writing '{key}' ({attempted} bytes, limit {limit})")]
    QuotaExceeded {
        key: String,
        attempted: usize,
        limit: usize,
    },
    /// Storage is disabled or could not be reached
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
    /// `SQLite` error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Synchronous string-keyed storage
pub trait KeyValueStorage: Send + Sync {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>>;
    fn set_item(&self, key: &str, value: &str) -> StorageResult<()>;
    fn remove_item(&self, key: &str) -> StorageResult<()>;
}

impl<T: KeyValueStorage + ?Sized> KeyValueStorage for std::sync::Arc<T> {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        (**self).remove_item(key)
    }
}
