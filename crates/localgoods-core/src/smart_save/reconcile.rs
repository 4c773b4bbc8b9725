//! Reconciler: drain queued removals, pull and merge, push what is left unsynced.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;

use super::{truncate_to_cap, SavedState, SmartSave};
use crate::auth::AuthSession;
use crate::local_store::sort_newest_first;
use crate::models::{PendingOp, SavedItem, SavedKind};
use crate::remote::{RemoteError, RemoteRecord, RemoteSavedItems};
use crate::state::SyncState;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SyncError {
    #[error("Sign in to sync saved items")]
    NotSignedIn,
    #[error("A sync is already running")]
    AlreadyRunning,
}

/// What one reconciliation pass did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Queued removals delivered
    pub ops_drained: usize,
    /// Local items written to the remote store
    pub pushed: usize,
    /// Remote-only items added locally
    pub adopted: usize,
    /// Local items overwritten by a newer remote version
    pub refreshed: usize,
    /// One entry per failed remote call
    pub failures: Vec<String>,
}

impl ReconcileReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    fn record_failure(&mut self, step: &str, error: &RemoteError) {
        tracing::warn!(step, "Sync step failed: {}", error);
        self.failures.push(format!("{step}: {error}"));
    }
}

/// Result of folding a remote list into a local one
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub items: Vec<SavedItem>,
    pub adopted: usize,
    pub refreshed: usize,
    pub evicted: usize,
}

/// Merge a pulled remote list into the local list of the same kind.
///
/// For subjects on both sides the newer timestamp wins and the result is
/// marked synced; a newer local edit stays unsynced. Remote-only subjects
/// are adopted unless a queued removal hides them. Local-only items are
/// kept untouched. The result is deduplicated, newest first and capped.
pub fn merge_lists(
    kind: SavedKind,
    local: Vec<SavedItem>,
    remote: Vec<RemoteRecord>,
    pending_ops: &[PendingOp],
    cap: usize,
) -> MergeOutcome {
    let mut newest_remote: HashMap<String, RemoteRecord> = HashMap::with_capacity(remote.len());
    for record in remote {
        if record.subject_id.trim().is_empty() {
            continue;
        }
        match newest_remote.get(&record.subject_id) {
            Some(existing) if existing.timestamp >= record.timestamp => {}
            _ => {
                newest_remote.insert(record.subject_id.clone(), record);
            }
        }
    }

    let mut outcome = MergeOutcome::default();
    let mut merged = Vec::with_capacity(local.len() + newest_remote.len());
    for mut item in local {
        if let Some(record) = newest_remote.remove(&item.subject_id) {
            match record.timestamp.cmp(&item.timestamp) {
                Ordering::Greater => {
                    item.timestamp = record.timestamp;
                    if let Some(id) = record.id {
                        item.id = id;
                    }
                    if record.snapshot.is_some() {
                        item.snapshot = record.snapshot;
                    }
                    item.synced = true;
                    outcome.refreshed += 1;
                }
                Ordering::Equal => item.synced = true,
                Ordering::Less => {}
            }
        }
        merged.push(item);
    }

    for (subject_id, record) in newest_remote {
        if pending_ops.iter().any(|op| op.suppresses(kind, &subject_id)) {
            continue;
        }
        merged.push(SavedItem {
            id: record.id.unwrap_or_default(),
            kind,
            subject_id,
            snapshot: record.snapshot,
            timestamp: record.timestamp,
            synced: true,
        });
        outcome.adopted += 1;
    }

    sort_newest_first(&mut merged);
    outcome.evicted = truncate_to_cap(&mut merged, cap);
    outcome.items = merged;
    outcome
}

/// Clears the in-progress flag even when the pass is cancelled mid-flight
struct ReconcileGuard<'a> {
    state: &'a Mutex<SavedState>,
}

impl Drop for ReconcileGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.reconciling = false;
        if state.sync_state == SyncState::Syncing {
            state.sync_state = SyncState::Error;
        }
    }
}

impl<R: RemoteSavedItems> SmartSave<R> {
    /// Run one reconciliation pass for the current session.
    ///
    /// Remote failures do not abort the pass; they are collected in the
    /// report and leave the affected items unsynced for the next attempt.
    pub async fn reconcile(&self) -> Result<ReconcileReport, SyncError> {
        let session = self
            .session
            .current_session()
            .ok_or(SyncError::NotSignedIn)?;
        let guard = {
            let mut state = self.state();
            if state.reconciling {
                return Err(SyncError::AlreadyRunning);
            }
            state.reconciling = true;
            state.sync_state = SyncState::Syncing;
            ReconcileGuard { state: &self.state }
        };
        tracing::info!(user_id = %session.user_id(), "Syncing saved items");

        let report = self.run_pass(&session).await;

        self.state().sync_state = if report.is_complete() {
            SyncState::Synced
        } else {
            SyncState::Error
        };
        drop(guard);

        if report.is_complete() {
            if report.pushed > 0 || report.adopted > 0 {
                self.notifier.sync_completed(report.pushed, report.adopted);
            }
        } else {
            self.notifier.sync_failed();
        }
        tracing::info!(
            ops_drained = report.ops_drained,
            pushed = report.pushed,
            adopted = report.adopted,
            refreshed = report.refreshed,
            failures = report.failures.len(),
            "Sync finished"
        );
        Ok(report)
    }

    /// Reconcile whenever a different user signs in. Runs until every
    /// sender of `sessions` is dropped.
    ///
    /// `sessions` should come from the same handle this instance reads its
    /// session from.
    pub async fn watch_session(&self, mut sessions: watch::Receiver<Option<AuthSession>>) {
        let mut signed_in_user = sessions
            .borrow_and_update()
            .as_ref()
            .map(|session| session.user.id.clone());
        if signed_in_user.is_some() {
            self.reconcile_quietly("session restored").await;
        }

        while sessions.changed().await.is_ok() {
            let user = sessions
                .borrow_and_update()
                .as_ref()
                .map(|session| session.user.id.clone());
            if user.is_some() && user != signed_in_user {
                self.reconcile_quietly("signed in").await;
            }
            signed_in_user = user;
        }
    }

    async fn reconcile_quietly(&self, reason: &str) {
        match self.reconcile().await {
            Ok(_) => {}
            Err(SyncError::AlreadyRunning) => {
                tracing::debug!(reason, "Sync already running, skipping");
            }
            Err(error) => tracing::debug!(reason, "Sync skipped: {}", error),
        }
    }

    async fn run_pass(&self, session: &AuthSession) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        let queued = self.state().pending_ops.clone();
        for op in &queued {
            match self.flush_op(session, op).await {
                Ok(()) => report.ops_drained += 1,
                Err(error) => report.record_failure("remove", &error),
            }
        }

        // A failed pull only skips the merge; unsynced items are still pushed.
        for kind in SavedKind::ALL {
            match self.with_timeout(self.remote.list(session, kind)).await {
                Ok(records) => {
                    let outcome = self.apply_remote(kind, records);
                    report.adopted += outcome.adopted;
                    report.refreshed += outcome.refreshed;
                }
                Err(error) => report.record_failure(&format!("pull {}", kind.label()), &error),
            }
            self.push_unsynced(session, kind, &mut report).await;
        }

        report
    }

    async fn push_unsynced(&self, session: &AuthSession, kind: SavedKind, report: &mut ReconcileReport) {
        let unsynced: Vec<RemoteRecord> = self
            .state()
            .lists
            .list(kind)
            .iter()
            .filter(|item| !item.synced)
            .map(RemoteRecord::from)
            .collect();
        if unsynced.is_empty() {
            return;
        }

        let step = format!("push {}", kind.label());
        match kind {
            SavedKind::Favorite => {
                match self.with_timeout(self.remote.upsert(session, kind, &unsynced)).await {
                    Ok(()) => {
                        self.confirm_synced(kind, &unsynced);
                        report.pushed += unsynced.len();
                    }
                    Err(error) => report.record_failure(&step, &error),
                }
            }
            SavedKind::RecentView => {
                for record in unsynced {
                    let batch = std::slice::from_ref(&record);
                    match self.with_timeout(self.remote.upsert(session, kind, batch)).await {
                        Ok(()) => {
                            self.confirm_synced(kind, batch);
                            report.pushed += 1;
                        }
                        Err(error) => report.record_failure(&step, &error),
                    }
                }
            }
        }
    }

    /// Merge against the list as it is now, not as it was before the pull
    fn apply_remote(&self, kind: SavedKind, records: Vec<RemoteRecord>) -> MergeOutcome {
        let cap = self.cap(kind);
        let mut state = self.state();
        let pending: Vec<PendingOp> = state
            .pending_ops
            .iter()
            .filter(|op| op.kind() == kind)
            .cloned()
            .collect();
        let local = std::mem::take(state.lists.list_mut(kind));
        let mut outcome = merge_lists(kind, local, records, &pending, cap);
        *state.lists.list_mut(kind) = std::mem::take(&mut outcome.items);
        self.persist(&state, Some(kind), false);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::models::{ListingSnapshot, SavedItemId};

    fn local(subject: &str, timestamp: i64, synced: bool) -> SavedItem {
        SavedItem {
            synced,
            ..SavedItem::new(SavedKind::Favorite, subject, None, timestamp)
        }
    }

    fn remote(subject: &str, timestamp: i64) -> RemoteRecord {
        RemoteRecord {
            id: None,
            subject_id: subject.to_string(),
            timestamp,
            snapshot: None,
        }
    }

    fn summary(items: &[SavedItem]) -> Vec<(&str, i64, bool)> {
        items
            .iter()
            .map(|item| (item.subject_id.as_str(), item.timestamp, item.synced))
            .collect()
    }

    #[test]
    fn newer_timestamp_wins_on_both_sides() {
        let outcome = merge_lists(
            SavedKind::Favorite,
            vec![local("a", 100, false), local("b", 300, false)],
            vec![remote("a", 200), remote("b", 250)],
            &[],
            10,
        );

        assert_eq!(summary(&outcome.items), vec![("b", 300, false), ("a", 200, true)]);
        assert_eq!(outcome.refreshed, 1);
        assert_eq!(outcome.adopted, 0);
    }

    #[test]
    fn equal_timestamps_mark_synced() {
        let outcome = merge_lists(
            SavedKind::Favorite,
            vec![local("a", 100, false)],
            vec![remote("a", 100)],
            &[],
            10,
        );
        assert_eq!(summary(&outcome.items), vec![("a", 100, true)]);
    }

    #[test]
    fn remote_only_items_are_adopted_once() {
        let outcome = merge_lists(
            SavedKind::Favorite,
            vec![local("a", 100, true)],
            vec![remote("b", 50), remote("b", 80), remote("  ", 90)],
            &[],
            10,
        );
        assert_eq!(summary(&outcome.items), vec![("a", 100, true), ("b", 80, true)]);
        assert_eq!(outcome.adopted, 1);
    }

    #[test]
    fn queued_removals_hide_remote_rows() {
        let ops = vec![PendingOp::Delete {
            kind: SavedKind::Favorite,
            subject_id: "gone".to_string(),
        }];
        let outcome = merge_lists(
            SavedKind::Favorite,
            Vec::new(),
            vec![remote("gone", 10), remote("kept", 5)],
            &ops,
            10,
        );
        assert_eq!(summary(&outcome.items), vec![("kept", 5, true)]);
    }

    #[test]
    fn remote_refresh_keeps_local_snapshot_when_remote_has_none() {
        let snapshot = ListingSnapshot {
            title: Some("Sourdough".to_string()),
            ..ListingSnapshot::default()
        };
        let id = SavedItemId::new();
        let mut record = remote("a", 200);
        record.id = Some(id);

        let outcome = merge_lists(
            SavedKind::Favorite,
            vec![SavedItem::new(SavedKind::Favorite, "a", Some(snapshot.clone()), 100)],
            vec![record],
            &[],
            10,
        );

        let item = &outcome.items[0];
        assert_eq!(item.snapshot, Some(snapshot));
        assert_eq!(item.id, id);
        assert!(item.synced);
    }

    #[test]
    fn merged_list_respects_cap() {
        let outcome = merge_lists(
            SavedKind::Favorite,
            vec![local("a", 10, true)],
            vec![remote("b", 30), remote("c", 20)],
            &[],
            2,
        );
        assert_eq!(summary(&outcome.items), vec![("b", 30, true), ("c", 20, true)]);
        assert_eq!(outcome.evicted, 1);
    }
}
