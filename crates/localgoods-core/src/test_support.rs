//! In-memory doubles for unit tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::auth::{AuthSession, AuthUser};
use crate::models::SavedKind;
use crate::notify::{Notification, NotificationSurface};
use crate::remote::{RemoteError, RemoteRecord, RemoteResult, RemoteSavedItems};
use crate::util::Clock;

pub fn session(user_id: &str) -> AuthSession {
    AuthSession {
        access_token: format!("access-{user_id}"),
        refresh_token: format!("refresh-{user_id}"),
        expires_at: i64::MAX,
        user: AuthUser {
            id: user_id.to_string(),
            email: Some(format!("{user_id}@example.com")),
        },
    }
}

/// Clock that only moves when told to
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicI64,
}

impl ManualClock {
    pub const fn new(now_ms: i64) -> Self {
        Self {
            now_ms: AtomicI64::new(now_ms),
        }
    }

    pub fn advance_ms(&self, delta_ms: i64) {
        self.now_ms.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
pub struct RecordingSurface {
    shown: Mutex<Vec<Notification>>,
}

impl RecordingSurface {
    pub fn notifications(&self) -> Vec<Notification> {
        self.shown
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn titles(&self) -> Vec<String> {
        self.notifications()
            .into_iter()
            .map(|notification| notification.title)
            .collect()
    }
}

impl NotificationSurface for RecordingSurface {
    fn show(&self, notification: &Notification) {
        self.shown
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification.clone());
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Failures {
    upsert: bool,
    delete: bool,
    list: bool,
}

type RowKey = (String, SavedKind);

/// Remote store that keeps rows per `(user, kind)` and can be told to fail
#[derive(Default)]
pub struct FakeRemote {
    rows: Mutex<HashMap<RowKey, BTreeMap<String, RemoteRecord>>>,
    failures: Mutex<Failures>,
    delay: Mutex<Option<Duration>>,
    calls: Mutex<Vec<String>>,
}

impl FakeRemote {
    pub fn seed(&self, user_id: &str, kind: SavedKind, records: Vec<RemoteRecord>) {
        let mut rows = self.rows.lock().unwrap();
        let table = rows.entry((user_id.to_string(), kind)).or_default();
        for record in records {
            table.insert(record.subject_id.clone(), record);
        }
    }

    /// Rows for one user and kind, newest first
    pub fn rows(&self, user_id: &str, kind: SavedKind) -> Vec<RemoteRecord> {
        let rows = self.rows.lock().unwrap();
        let mut records: Vec<RemoteRecord> = rows
            .get(&(user_id.to_string(), kind))
            .map(|table| table.values().cloned().collect())
            .unwrap_or_default();
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        records
    }

    pub fn subjects(&self, user_id: &str, kind: SavedKind) -> Vec<String> {
        self.rows(user_id, kind)
            .into_iter()
            .map(|record| record.subject_id)
            .collect()
    }

    pub fn fail_upserts(&self, fail: bool) {
        self.failures.lock().unwrap().upsert = fail;
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.failures.lock().unwrap().delete = fail;
    }

    pub fn fail_lists(&self, fail: bool) {
        self.failures.lock().unwrap().list = fail;
    }

    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    async fn enter(&self, call: String) {
        self.calls.lock().unwrap().push(call);
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn failures(&self) -> Failures {
        *self.failures.lock().unwrap()
    }
}

impl RemoteSavedItems for FakeRemote {
    async fn upsert(
        &self,
        session: &AuthSession,
        kind: SavedKind,
        records: &[RemoteRecord],
    ) -> RemoteResult<()> {
        self.enter(format!("upsert {} x{}", kind.label(), records.len()))
            .await;
        if self.failures().upsert {
            return Err(RemoteError::Api("upsert unavailable".to_string()));
        }
        self.seed(session.user_id(), kind, records.to_vec());
        Ok(())
    }

    async fn delete(&self, session: &AuthSession, kind: SavedKind, subject_id: &str)
        -> RemoteResult<()> {
        self.enter(format!("delete {} {subject_id}", kind.label()))
            .await;
        if self.failures().delete {
            return Err(RemoteError::Api("delete unavailable".to_string()));
        }
        if let Some(table) = self
            .rows
            .lock()
            .unwrap()
            .get_mut(&(session.user_id().to_string(), kind))
        {
            table.remove(subject_id);
        }
        Ok(())
    }

    async fn delete_all(&self, session: &AuthSession, kind: SavedKind) -> RemoteResult<()> {
        self.enter(format!("delete_all {}", kind.label())).await;
        if self.failures().delete {
            return Err(RemoteError::Api("delete unavailable".to_string()));
        }
        self.rows
            .lock()
            .unwrap()
            .remove(&(session.user_id().to_string(), kind));
        Ok(())
    }

    async fn list(&self, session: &AuthSession, kind: SavedKind) -> RemoteResult<Vec<RemoteRecord>> {
        self.enter(format!("list {}", kind.label())).await;
        if self.failures().list {
            return Err(RemoteError::Api("list unavailable".to_string()));
        }
        Ok(self.rows(session.user_id(), kind))
    }
}
