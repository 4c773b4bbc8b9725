//! Remote saved-items store contract.
//!
//! The managed backend owns the schema; this module only fixes the
//! request/response shape the Reconciler relies on.

mod supabase;

use std::time::Duration;

use thiserror::Error;

use crate::auth::AuthSession;
use crate::models::{ListingSnapshot, SavedItem, SavedItemId, SavedKind};

pub use supabase::{RemoteTable, SupabaseSavedItemsClient};

/// One server-side row of a saved list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRecord {
    /// Server-assigned id, when the backend exposes one
    pub id: Option<SavedItemId>,
    pub subject_id: String,
    /// Unix ms
    pub timestamp: i64,
    pub snapshot: Option<ListingSnapshot>,
}

impl From<&SavedItem> for RemoteRecord {
    fn from(item: &SavedItem) -> Self {
        Self {
            id: None,
            subject_id: item.subject_id.clone(),
            timestamp: item.timestamp,
            snapshot: item.snapshot.clone(),
        }
    }
}

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Remote store is not configured")]
    NotConfigured,
    #[error("Invalid remote configuration: {0}")]
    InvalidConfiguration(String),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Session rejected by remote store: {0}")]
    Unauthorized(String),
    #[error("Remote API error: {0}")]
    Api(String),
    #[error("Invalid remote payload: {0}")]
    InvalidPayload(String),
    #[error("Remote call timed out after {0:?}")]
    Timeout(Duration),
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Server-side favorites and recent views for the signed-in user
#[allow(async_fn_in_trait)]
pub trait RemoteSavedItems {
    /// Insert or refresh rows, keyed by `(user, subject_id)`
    async fn upsert(
        &self,
        session: &AuthSession,
        kind: SavedKind,
        records: &[RemoteRecord],
    ) -> RemoteResult<()>;

    async fn delete(&self, session: &AuthSession, kind: SavedKind, subject_id: &str)
        -> RemoteResult<()>;

    async fn delete_all(&self, session: &AuthSession, kind: SavedKind) -> RemoteResult<()>;

    async fn list(&self, session: &AuthSession, kind: SavedKind) -> RemoteResult<Vec<RemoteRecord>>;
}

impl<T: RemoteSavedItems> RemoteSavedItems for std::sync::Arc<T> {
    async fn upsert(
        &self,
        session: &AuthSession,
        kind: SavedKind,
        records: &[RemoteRecord],
    ) -> RemoteResult<()> {
        (**self).upsert(session, kind, records).await
    }

    async fn delete(&self, session: &AuthSession, kind: SavedKind, subject_id: &str)
        -> RemoteResult<()> {
        (**self).delete(session, kind, subject_id).await
    }

    async fn delete_all(&self, session: &AuthSession, kind: SavedKind) -> RemoteResult<()> {
        (**self).delete_all(session, kind).await
    }

    async fn list(&self, session: &AuthSession, kind: SavedKind) -> RemoteResult<Vec<RemoteRecord>> {
        (**self).list(session, kind).await
    }
}
