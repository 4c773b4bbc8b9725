//! Local Store: on-device persistence of the saved lists.
//!
//! Every operation is synchronous and fails soft. Read errors degrade to
//! empty state, write errors are logged and reported as `false` so the
//! caller can keep going with in-memory state.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::models::{PendingOp, SavedItem, SavedKind};
use crate::storage::KeyValueStorage;

/// Both saved lists, each sorted by timestamp descending
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SavedLists {
    pub favorites: Vec<SavedItem>,
    pub recent_views: Vec<SavedItem>,
}

impl SavedLists {
    pub fn list(&self, kind: SavedKind) -> &[SavedItem] {
        match kind {
            SavedKind::Favorite => &self.favorites,
            SavedKind::RecentView => &self.recent_views,
        }
    }

    pub fn list_mut(&mut self, kind: SavedKind) -> &mut Vec<SavedItem> {
        match kind {
            SavedKind::Favorite => &mut self.favorites,
            SavedKind::RecentView => &mut self.recent_views,
        }
    }

    /// True iff any item in either list is unsynced
    pub fn has_unsynced(&self) -> bool {
        self.favorites
            .iter()
            .chain(&self.recent_views)
            .any(|item| !item.synced)
    }
}

/// Partial write: only the lists that are `Some` are persisted
#[derive(Debug, Clone, Copy, Default)]
pub struct SavedListsUpdate<'a> {
    pub favorites: Option<&'a [SavedItem]>,
    pub recent_views: Option<&'a [SavedItem]>,
}

impl<'a> SavedListsUpdate<'a> {
    pub const fn only(kind: SavedKind, items: &'a [SavedItem]) -> Self {
        match kind {
            SavedKind::Favorite => Self {
                favorites: Some(items),
                recent_views: None,
            },
            SavedKind::RecentView => Self {
                favorites: None,
                recent_views: Some(items),
            },
        }
    }

    pub const fn both(lists: &'a SavedLists) -> Self {
        Self {
            favorites: Some(lists.favorites.as_slice()),
            recent_views: Some(lists.recent_views.as_slice()),
        }
    }
}

#[derive(Debug, Clone)]
struct StorageKeys {
    favorites: String,
    recent_views: String,
    pending_ops: String,
    nudge_shown_at: String,
}

impl StorageKeys {
    fn new(namespace: &str) -> Self {
        Self {
            favorites: format!("{namespace}.favorites"),
            recent_views: format!("{namespace}.recent_views"),
            pending_ops: format!("{namespace}.pending_ops"),
            nudge_shown_at: format!("{namespace}.sync_nudge_shown_at"),
        }
    }

    fn list(&self, kind: SavedKind) -> &str {
        match kind {
            SavedKind::Favorite => &self.favorites,
            SavedKind::RecentView => &self.recent_views,
        }
    }
}

/// Namespaced view over a `KeyValueStorage` backend
pub struct LocalStore {
    storage: Box<dyn KeyValueStorage>,
    keys: StorageKeys,
}

impl LocalStore {
    pub fn new(storage: impl KeyValueStorage + 'static, namespace: &str) -> Self {
        Self {
            storage: Box::new(storage),
            keys: StorageKeys::new(namespace),
        }
    }

    /// Load both lists. Never fails; a broken list loads as empty.
    pub fn load(&self) -> SavedLists {
        SavedLists {
            favorites: self.load_list(SavedKind::Favorite),
            recent_views: self.load_list(SavedKind::RecentView),
        }
    }

    /// Persist whichever lists are provided. Returns `false` if any write failed.
    pub fn save(&self, update: SavedListsUpdate<'_>) -> bool {
        let mut persisted = true;
        if let Some(favorites) = update.favorites {
            persisted &= self.write_json(self.keys.list(SavedKind::Favorite), favorites);
        }
        if let Some(recent_views) = update.recent_views {
            persisted &= self.write_json(self.keys.list(SavedKind::RecentView), recent_views);
        }
        persisted
    }

    /// True iff any persisted item has `synced = false`
    pub fn has_pending_sync(&self) -> bool {
        self.load().has_unsynced()
    }

    pub fn load_pending_ops(&self) -> Vec<PendingOp> {
        self.read_json(&self.keys.pending_ops).unwrap_or_default()
    }

    pub fn save_pending_ops(&self, ops: &[PendingOp]) -> bool {
        if ops.is_empty() {
            return self.remove(&self.keys.pending_ops);
        }
        self.write_json(&self.keys.pending_ops, ops)
    }

    /// When the sign-in nudge was last shown (Unix ms)
    pub fn last_nudge_at(&self) -> Option<i64> {
        self.read_json(&self.keys.nudge_shown_at)
    }

    pub fn record_nudge_at(&self, shown_at_ms: i64) -> bool {
        self.write_json(&self.keys.nudge_shown_at, &shown_at_ms)
    }

    /// Local data reset: drop every key in this namespace
    pub fn clear(&self) -> bool {
        [
            &self.keys.favorites,
            &self.keys.recent_views,
            &self.keys.pending_ops,
            &self.keys.nudge_shown_at,
        ]
        .into_iter()
        .fold(true, |cleared, key| self.remove(key) && cleared)
    }

    fn load_list(&self, kind: SavedKind) -> Vec<SavedItem> {
        let items: Vec<SavedItem> = self.read_json(self.keys.list(kind)).unwrap_or_default();
        normalize_list(kind, items)
    }

    fn read_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.storage.get_item(key) {
            Ok(raw) => raw?,
            Err(error) => {
                tracing::warn!(key, "Failed to read local storage: {}", error);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(error) => {
                tracing::warn!(key, "Discarding malformed local data: {}", error);
                None
            }
        }
    }

    fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> bool {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(error) => {
                tracing::warn!(key, "Failed to serialize local data: {}", error);
                return false;
            }
        };
        match self.storage.set_item(key, &raw) {
            Ok(()) => true,
            Err(error) => {
                tracing::warn!(key, "Local storage write failed, keeping in-memory state: {}", error);
                false
            }
        }
    }

    fn remove(&self, key: &str) -> bool {
        match self.storage.remove_item(key) {
            Ok(()) => true,
            Err(error) => {
                tracing::warn!(key, "Failed to remove local storage key: {}", error);
                false
            }
        }
    }
}

/// Keep only items of `kind`, one per subject (newest wins), newest first.
pub(crate) fn normalize_list(kind: SavedKind, items: Vec<SavedItem>) -> Vec<SavedItem> {
    let mut newest: HashMap<String, SavedItem> = HashMap::with_capacity(items.len());
    for item in items.into_iter().filter(|item| item.kind == kind) {
        match newest.get(&item.subject_id) {
            Some(existing) if existing.timestamp >= item.timestamp => {}
            _ => {
                newest.insert(item.subject_id.clone(), item);
            }
        }
    }
    let mut items = newest.into_values().collect::<Vec<_>>();
    sort_newest_first(&mut items);
    items
}

/// Timestamp descending; subject id breaks ties so ordering is deterministic
pub(crate) fn sort_newest_first(items: &mut [SavedItem]) {
    items.sort_by(|a, b| {
        b.timestamp
            .cmp(&a.timestamp)
            .then_with(|| a.subject_id.cmp(&b.subject_id))
    });
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::storage::MemoryStorage;

    fn item(kind: SavedKind, subject: &str, timestamp: i64, synced: bool) -> SavedItem {
        SavedItem {
            synced,
            ..SavedItem::new(kind, subject, None, timestamp)
        }
    }

    fn store() -> (Arc<MemoryStorage>, LocalStore) {
        let storage = Arc::new(MemoryStorage::new());
        let store = LocalStore::new(Arc::clone(&storage), "test");
        (storage, store)
    }

    #[test]
    fn load_of_empty_storage_is_empty() {
        let (_, store) = store();
        assert_eq!(store.load(), SavedLists::default());
        assert!(!store.has_pending_sync());
    }

    #[test]
    fn save_then_load_reproduces_items() {
        let (_, store) = store();
        let lists = SavedLists {
            favorites: vec![
                item(SavedKind::Favorite, "a", 10, true),
                item(SavedKind::Favorite, "b", 30, false),
            ],
            recent_views: vec![item(SavedKind::RecentView, "c", 20, true)],
        };

        assert!(store.save(SavedListsUpdate::both(&lists)));
        let loaded = store.load();
        store.save(SavedListsUpdate::both(&loaded));
        let reloaded = store.load();

        let as_set = |items: &[SavedItem]| {
            items
                .iter()
                .map(|item| (item.subject_id.clone(), item.timestamp, item.synced))
                .collect::<HashSet<_>>()
        };
        assert_eq!(as_set(&reloaded.favorites), as_set(&lists.favorites));
        assert_eq!(as_set(&reloaded.recent_views), as_set(&lists.recent_views));
        assert_eq!(reloaded.favorites[0].subject_id, "b");
    }

    #[test]
    fn partial_save_does_not_clobber_other_list() {
        let (_, store) = store();
        let views = vec![item(SavedKind::RecentView, "v", 5, true)];
        store.save(SavedListsUpdate::only(SavedKind::RecentView, &views));

        let favorites = vec![item(SavedKind::Favorite, "f", 6, true)];
        store.save(SavedListsUpdate::only(SavedKind::Favorite, &favorites));

        let loaded = store.load();
        assert_eq!(loaded.recent_views, views);
        assert_eq!(loaded.favorites, favorites);
    }

    #[test]
    fn corrupt_list_loads_empty_without_touching_the_other() {
        let (storage, store) = store();
        let favorites = vec![item(SavedKind::Favorite, "f", 6, false)];
        store.save(SavedListsUpdate::only(SavedKind::Favorite, &favorites));
        storage.set_item("test.recent_views", "{not json").unwrap();

        let loaded = store.load();
        assert!(loaded.recent_views.is_empty());
        assert_eq!(loaded.favorites, favorites);
        assert!(store.has_pending_sync());
    }

    #[test]
    fn load_deduplicates_and_sorts() {
        let (storage, store) = store();
        let raw = serde_json::to_string(&vec![
            item(SavedKind::Favorite, "a", 1, true),
            item(SavedKind::Favorite, "b", 3, true),
            item(SavedKind::Favorite, "a", 5, false),
        ])
        .unwrap();
        storage.set_item("test.favorites", &raw).unwrap();

        let loaded = store.load();
        let subjects = loaded
            .favorites
            .iter()
            .map(|item| (item.subject_id.as_str(), item.timestamp))
            .collect::<Vec<_>>();
        assert_eq!(subjects, vec![("a", 5), ("b", 3)]);
    }

    #[test]
    fn quota_failure_is_reported_not_raised() {
        let storage = Arc::new(MemoryStorage::with_quota(4));
        let store = LocalStore::new(Arc::clone(&storage), "test");
        let favorites = vec![item(SavedKind::Favorite, "f", 6, false)];

        assert!(!store.save(SavedListsUpdate::only(SavedKind::Favorite, &favorites)));
        assert!(store.load().favorites.is_empty());
    }

    #[test]
    fn pending_ops_and_nudge_roundtrip_then_clear() {
        let (storage, store) = store();
        let ops = vec![PendingOp::ClearAll {
            kind: SavedKind::RecentView,
        }];
        assert!(store.save_pending_ops(&ops));
        assert!(store.record_nudge_at(1234));
        assert_eq!(store.load_pending_ops(), ops);
        assert_eq!(store.last_nudge_at(), Some(1234));

        assert!(store.save_pending_ops(&[]));
        assert!(store.load_pending_ops().is_empty());

        assert!(store.clear());
        assert_eq!(store.last_nudge_at(), None);
        assert!(storage.is_empty());
    }
}
