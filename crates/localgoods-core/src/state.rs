//! Shared cross-client state types.

use serde::{Deserialize, Serialize};

/// Reconciliation status exposed to clients.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncState {
    /// No reconciliation has run yet in this session.
    #[default]
    Idle,
    Syncing,
    Synced,
    /// Last reconciliation attempt had at least one failed sub-step.
    Error,
}

impl SyncState {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Syncing => "syncing",
            Self::Synced => "synced",
            Self::Error => "error",
        }
    }
}
