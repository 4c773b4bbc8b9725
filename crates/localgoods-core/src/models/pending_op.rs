//! Queued remote operations that have not been confirmed yet

use serde::{Deserialize, Serialize};

use super::SavedKind;

/// A removal that still has to reach the remote store.
///
/// Upserts are not queued: an unsynced item in the local list already is
/// the pending upsert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PendingOp {
    /// Delete one subject from a remote list
    Delete { kind: SavedKind, subject_id: String },
    /// Delete every remote entry of a list for the signed-in user
    ClearAll { kind: SavedKind },
}

impl PendingOp {
    pub const fn kind(&self) -> SavedKind {
        match self {
            Self::Delete { kind, .. } | Self::ClearAll { kind } => *kind,
        }
    }

    /// Whether this op hides a remote record of `kind`/`subject_id` from adoption
    pub fn suppresses(&self, kind: SavedKind, subject_id: &str) -> bool {
        match self {
            Self::Delete {
                kind: op_kind,
                subject_id: op_subject,
            } => *op_kind == kind && op_subject == subject_id,
            Self::ClearAll { kind: op_kind } => *op_kind == kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_op_tag() {
        let op = PendingOp::Delete {
            kind: SavedKind::Favorite,
            subject_id: "sku-1".to_string(),
        };
        let raw = serde_json::to_string(&op).unwrap();
        assert_eq!(
            raw,
            r#"{"op":"delete","kind":"favorite","subject_id":"sku-1"}"#
        );
        let parsed: PendingOp = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed, op);
    }

    #[test]
    fn clear_all_suppresses_every_subject_of_its_kind() {
        let op = PendingOp::ClearAll {
            kind: SavedKind::RecentView,
        };
        assert!(op.suppresses(SavedKind::RecentView, "anything"));
        assert!(!op.suppresses(SavedKind::Favorite, "anything"));
    }

    #[test]
    fn delete_suppresses_only_its_subject() {
        let op = PendingOp::Delete {
            kind: SavedKind::Favorite,
            subject_id: "sku-1".to_string(),
        };
        assert!(op.suppresses(SavedKind::Favorite, "sku-1"));
        assert!(!op.suppresses(SavedKind::Favorite, "sku-2"));
        assert!(!op.suppresses(SavedKind::RecentView, "sku-1"));
    }
}
