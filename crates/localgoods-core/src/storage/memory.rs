//! In-process storage backend

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{KeyValueStorage, StorageError, StorageResult};

/// `HashMap`-backed storage with an optional byte quota.
///
/// The quota counts key and value bytes of every stored entry, mirroring
/// browser local storage limits closely enough to exercise quota failures.
#[derive(Debug)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
    quota_bytes: AtomicUsize,
}

const UNLIMITED: usize = usize::MAX;

impl Default for MemoryStorage {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            quota_bytes: AtomicUsize::new(UNLIMITED),
        }
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage that rejects writes once `quota_bytes` would be exceeded
    pub fn with_quota(quota_bytes: usize) -> Self {
        let storage = Self::default();
        storage.set_quota(Some(quota_bytes));
        storage
    }

    /// Change the quota of a live store (`None` lifts it)
    pub fn set_quota(&self, quota_bytes: Option<usize>) {
        self.quota_bytes
            .store(quota_bytes.unwrap_or(UNLIMITED), Ordering::SeqCst);
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut entries = self.entries();
        let limit = self.quota_bytes.load(Ordering::SeqCst);
        if limit != UNLIMITED {
            let others: usize = entries
                .iter()
                .filter(|(existing, _)| existing.as_str() != key)
                .map(|(existing, stored)| existing.len() + stored.len())
                .sum();
            let attempted = others + key.len() + value.len();
            if attempted > limit {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                    attempted,
                    limit,
                });
            }
        }
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        self.entries().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_remove_roundtrip() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get_item("a").unwrap(), None);

        storage.set_item("a", "1").unwrap();
        assert_eq!(storage.get_item("a").unwrap().as_deref(), Some("1"));

        storage.remove_item("a").unwrap();
        assert!(storage.is_empty());
    }

    #[test]
    fn quota_rejects_oversized_writes_and_keeps_old_value() {
        let storage = MemoryStorage::with_quota(8);
        storage.set_item("k", "1234").unwrap();

        let error = storage.set_item("k", "123456789").unwrap_err();
        assert!(matches!(error, StorageError::QuotaExceeded { limit: 8, .. }));
        assert_eq!(storage.get_item("k").unwrap().as_deref(), Some("1234"));
    }

    #[test]
    fn quota_counts_other_keys() {
        let storage = MemoryStorage::with_quota(10);
        storage.set_item("a", "1234").unwrap();
        assert!(storage.set_item("b", "12345").is_err());
        assert_eq!(storage.len(), 1);
    }
}
