//! Smart Save: offline-first favorites and recently viewed listings.
//!
//! `SmartSave` is the only writer of saved state. Every mutation commits the
//! in-memory lists and the Local Store before its first `.await`, so calls
//! for the same subject apply in the order they were issued even when their
//! remote writes finish out of order. Remote confirmations are keyed by
//! `(subject_id, timestamp)` and never mark a newer local edit as synced.
//!
//! Construct one instance per client process and share it by reference or
//! `Arc`. Callers that want fire-and-forget behaviour spawn the returned
//! future; awaiting it only waits for the bounded remote attempt.

mod reconcile;


use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::auth::AuthSession;
use crate::config::SmartSaveConfig;
use crate::local_store::{sort_newest_first, LocalStore, SavedLists, SavedListsUpdate};
use crate::models::{ListingSnapshot, PendingOp, SavedItem, SavedKind};
use crate::notify::{NotificationSurface, Notifier};
use crate::remote::{RemoteError, RemoteRecord, RemoteResult, RemoteSavedItems};
use crate::session::SessionProvider;
use crate::state::SyncState;
use crate::storage::KeyValueStorage;
use crate::util::{Clock, SystemClock};
use crate::{Error, Result};

pub use reconcile::{merge_lists, MergeOutcome, ReconcileReport, SyncError};

#[derive(Debug, Default)]
struct SavedState {
    lists: SavedLists,
    pending_ops: Vec<PendingOp>,
    sync_state: SyncState,
    reconciling: bool,
}

pub struct SmartSave<R> {
    config: SmartSaveConfig,
    store: LocalStore,
    remote: R,
    session: Arc<dyn SessionProvider>,
    notifier: Notifier,
    clock: Arc<dyn Clock>,
    state: Mutex<SavedState>,
}

impl<R: RemoteSavedItems> SmartSave<R> {
    /// Load persisted state from `storage` and wire the collaborators.
    pub fn new(
        config: SmartSaveConfig,
        storage: impl KeyValueStorage + 'static,
        remote: R,
        session: Arc<dyn SessionProvider>,
        surface: impl NotificationSurface + 'static,
    ) -> Result<Self> {
        config.validate()?;
        let store = LocalStore::new(storage, &config.storage_namespace);
        let mut lists = store.load();
        truncate_to_cap(&mut lists.favorites, config.favorites_cap);
        truncate_to_cap(&mut lists.recent_views, config.recent_views_cap);
        let pending_ops = store.load_pending_ops();
        tracing::debug!(
            favorites = lists.favorites.len(),
            recent_views = lists.recent_views.len(),
            pending_ops = pending_ops.len(),
            "Loaded saved items"
        );

        Ok(Self {
            notifier: Notifier::new(surface, config.nudge_interval_ms()),
            config,
            store,
            remote,
            session,
            clock: Arc::new(SystemClock),
            state: Mutex::new(SavedState {
                lists,
                pending_ops,
                ..SavedState::default()
            }),
        })
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Favorites, newest first
    pub fn favorites(&self) -> Vec<SavedItem> {
        self.state().lists.favorites.clone()
    }

    /// Recent views, newest first
    pub fn recent_views(&self) -> Vec<SavedItem> {
        self.state().lists.recent_views.clone()
    }

    pub fn is_favorited(&self, subject_id: &str) -> bool {
        self.contains(SavedKind::Favorite, subject_id)
    }

    pub fn was_recently_viewed(&self, subject_id: &str) -> bool {
        self.contains(SavedKind::RecentView, subject_id)
    }

    /// True while any item is unsynced or a removal is still queued
    pub fn has_pending_sync(&self) -> bool {
        let state = self.state();
        state.lists.has_unsynced() || !state.pending_ops.is_empty()
    }

    pub fn pending_ops(&self) -> Vec<PendingOp> {
        self.state().pending_ops.clone()
    }

    pub fn sync_state(&self) -> SyncState {
        self.state().sync_state
    }

    /// Favorite a listing, or refresh it and move it to the front.
    ///
    /// A refresh always takes a new timestamp. It replaces the snapshot
    /// only when one is given; `None` keeps the previous snapshot for
    /// display.
    ///
    /// Returns the item as committed locally. With a session the item is
    /// pushed right away; without one the user may get the sign-in nudge.
    pub async fn add_favorite(
        &self,
        subject_id: &str,
        snapshot: Option<ListingSnapshot>,
    ) -> Result<SavedItem> {
        let session = self.session.current_session();
        let item = self.commit_save(SavedKind::Favorite, subject_id, snapshot)?;
        self.notifier
            .favorite_added(session.is_some(), item.display_title());

        match session {
            Some(session) => self.push_item(&session, &item).await,
            None => {
                self.notifier
                    .maybe_nudge_sign_in(&self.store, self.clock.now_ms());
            }
        }
        Ok(item)
    }

    /// Unfavorite a listing. Returns `false` when it was not a favorite.
    pub async fn remove_favorite(&self, subject_id: &str) -> bool {
        let Some((removed, op)) = self.commit_remove(SavedKind::Favorite, subject_id) else {
            return false;
        };
        self.notifier.favorite_removed(removed.display_title());

        if let Some(session) = self.session.current_session() {
            if let Err(error) = self.flush_op(&session, &op).await {
                tracing::warn!(
                    subject_id = %removed.subject_id,
                    "Remote unfavorite failed, queued for next sync: {}",
                    error
                );
            }
        }
        true
    }

    /// Record a listing view. Never notifies.
    ///
    /// Refresh rules match [`Self::add_favorite`]: new timestamp, and the
    /// previous snapshot is kept when `snapshot` is `None`.
    pub async fn add_recent_view(
        &self,
        subject_id: &str,
        snapshot: Option<ListingSnapshot>,
    ) -> Result<SavedItem> {
        let item = self.commit_save(SavedKind::RecentView, subject_id, snapshot)?;
        if let Some(session) = self.session.current_session() {
            self.push_item(&session, &item).await;
        }
        Ok(item)
    }

    /// Empty the recently viewed list here and, best effort, remotely
    pub async fn clear_recent_views(&self) {
        let op = PendingOp::ClearAll {
            kind: SavedKind::RecentView,
        };
        {
            let mut state = self.state();
            state.lists.recent_views.clear();
            state
                .pending_ops
                .retain(|queued| queued.kind() != SavedKind::RecentView);
            state.pending_ops.push(op.clone());
            self.persist(&state, Some(SavedKind::RecentView), true);
        }
        self.notifier.recent_views_cleared();

        if let Some(session) = self.session.current_session() {
            if let Err(error) = self.flush_op(&session, &op).await {
                tracing::warn!("Remote history clear failed, queued for next sync: {}", error);
            }
        }
    }

    /// Forget every saved item and queued operation on this device
    pub fn reset_local_data(&self) {
        let mut state = self.state();
        *state = SavedState {
            reconciling: state.reconciling,
            ..SavedState::default()
        };
        if !self.store.clear() {
            tracing::warn!("Local data reset could not remove every stored key");
        }
        tracing::info!("Local saved items reset");
    }

    fn state(&self) -> MutexGuard<'_, SavedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    const fn cap(&self, kind: SavedKind) -> usize {
        match kind {
            SavedKind::Favorite => self.config.favorites_cap,
            SavedKind::RecentView => self.config.recent_views_cap,
        }
    }

    fn contains(&self, kind: SavedKind, subject_id: &str) -> bool {
        let subject_id = subject_id.trim();
        self.state()
            .lists
            .list(kind)
            .iter()
            .any(|item| item.subject_id == subject_id)
    }

    /// Refresh-or-prepend, enforce the cap, persist. No suspension points.
    fn commit_save(
        &self,
        kind: SavedKind,
        subject_id: &str,
        snapshot: Option<ListingSnapshot>,
    ) -> Result<SavedItem> {
        let subject_id = subject_id.trim();
        if subject_id.is_empty() {
            return Err(Error::InvalidInput("listing id must not be empty".to_string()));
        }
        let snapshot = snapshot.and_then(ListingSnapshot::non_empty);
        let now = self.clock.now_ms();
        let cap = self.cap(kind);

        let mut state = self.state();
        let list = state.lists.list_mut(kind);
        let item = match list.iter().position(|item| item.subject_id == subject_id) {
            Some(index) => {
                let previous = list.remove(index);
                SavedItem {
                    timestamp: now.max(previous.timestamp.saturating_add(1)),
                    snapshot: snapshot.or(previous.snapshot),
                    synced: false,
                    ..previous
                }
            }
            None => SavedItem::new(kind, subject_id, snapshot, now),
        };
        list.insert(0, item.clone());
        sort_newest_first(list);
        let evicted = truncate_to_cap(list, cap);
        if evicted > 0 {
            tracing::debug!(kind = kind.label(), evicted, "Evicted oldest saved items");
        }

        let queued_before = state.pending_ops.len();
        state.pending_ops.retain(|op| {
            !matches!(op, PendingOp::Delete { kind: op_kind, subject_id: op_subject }
                if *op_kind == kind && op_subject == subject_id)
        });
        let ops_changed = state.pending_ops.len() != queued_before;

        self.persist(&state, Some(kind), ops_changed);
        Ok(item)
    }

    fn commit_remove(&self, kind: SavedKind, subject_id: &str) -> Option<(SavedItem, PendingOp)> {
        let subject_id = subject_id.trim();
        let mut state = self.state();
        let list = state.lists.list_mut(kind);
        let index = list.iter().position(|item| item.subject_id == subject_id)?;
        let removed = list.remove(index);

        let op = PendingOp::Delete {
            kind,
            subject_id: removed.subject_id.clone(),
        };
        if !state.pending_ops.contains(&op) {
            state.pending_ops.push(op.clone());
        }
        self.persist(&state, Some(kind), true);
        Some((removed, op))
    }

    fn persist(&self, state: &SavedState, kind: Option<SavedKind>, ops_changed: bool) {
        if let Some(kind) = kind {
            self.store
                .save(SavedListsUpdate::only(kind, state.lists.list(kind)));
        }
        if ops_changed {
            self.store.save_pending_ops(&state.pending_ops);
        }
    }

    async fn with_timeout<T>(&self, call: impl Future<Output = RemoteResult<T>>) -> RemoteResult<T> {
        let limit = self.config.remote_timeout();
        tokio::time::timeout(limit, call)
            .await
            .unwrap_or(Err(RemoteError::Timeout(limit)))
    }

    async fn push_item(&self, session: &AuthSession, item: &SavedItem) {
        let record = RemoteRecord::from(item);
        let result = self
            .with_timeout(
                self.remote
                    .upsert(session, item.kind, std::slice::from_ref(&record)),
            )
            .await;

        match result {
            Ok(()) => {
                self.confirm_synced(item.kind, &[record]);
            }
            Err(error) => tracing::warn!(
                kind = item.kind.label(),
                subject_id = %item.subject_id,
                "Remote save failed, will retry on next sync: {}",
                error
            ),
        }
    }

    /// Flip `synced` for items whose current timestamp matches a confirmed
    /// write. Returns how many items flipped.
    fn confirm_synced(&self, kind: SavedKind, confirmed: &[RemoteRecord]) -> usize {
        let mut state = self.state();
        let mut flipped = 0;
        for item in state.lists.list_mut(kind).iter_mut() {
            let matches = confirmed.iter().any(|record| {
                record.subject_id == item.subject_id && record.timestamp == item.timestamp
            });
            if matches && !item.synced {
                item.synced = true;
                flipped += 1;
            }
        }
        if flipped > 0 {
            self.persist(&state, Some(kind), false);
        }
        flipped
    }

    /// Send one queued removal; on success drop it from the queue.
    async fn flush_op(&self, session: &AuthSession, op: &PendingOp) -> RemoteResult<()> {
        let call = async {
            match op {
                PendingOp::Delete { kind, subject_id } => {
                    self.remote.delete(session, *kind, subject_id).await
                }
                PendingOp::ClearAll { kind } => self.remote.delete_all(session, *kind).await,
            }
        };
        self.with_timeout(call).await?;
        self.complete_op(op);
        Ok(())
    }

    fn complete_op(&self, op: &PendingOp) {
        let kind = op.kind();
        let mut state = self.state();
        if let Some(index) = state.pending_ops.iter().position(|queued| queued == op) {
            state.pending_ops.remove(index);
        }

        // Subjects saved again while the removal was in flight lost their
        // server row; push them again on the next pass.
        let mut resurrected = 0;
        for item in state.lists.list_mut(kind).iter_mut() {
            if item.synced && op.suppresses(kind, &item.subject_id) {
                item.synced = false;
                resurrected += 1;
            }
        }
        self.persist(&state, (resurrected > 0).then_some(kind), true);
    }
}

/// Drop everything past `cap`. Returns how many items were evicted.
fn truncate_to_cap(items: &mut Vec<SavedItem>, cap: usize) -> usize {
    let evicted = items.len().saturating_sub(cap);
    items.truncate(cap);
    evicted
}
