//! Saved item model (favorites and recent views)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A unique identifier for a saved item, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SavedItemId(Uuid);

impl SavedItemId {
    /// Create a new client-side identifier using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for SavedItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SavedItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SavedItemId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Which saved list an item belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SavedKind {
    /// Intentionally favorited listing
    Favorite,
    /// Ambient "recently viewed" entry
    RecentView,
}

impl SavedKind {
    pub const ALL: [Self; 2] = [Self::Favorite, Self::RecentView];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Favorite => "favorite",
            Self::RecentView => "recent_view",
        }
    }
}

impl fmt::Display for SavedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Denormalized listing display data captured at save time.
///
/// Every field is optional and allowed to go stale; renderers fall back to
/// the `display_*` helpers when a field is missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Price in minor currency units (cents)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_cents: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seller_name: Option<String>,
}

impl ListingSnapshot {
    /// Returns `None` when no field carries a value.
    #[must_use]
    pub fn non_empty(self) -> Option<Self> {
        if self.title.is_none()
            && self.price_cents.is_none()
            && self.image_url.is_none()
            && self.seller_name.is_none()
        {
            None
        } else {
            Some(self)
        }
    }

    /// Title for display, falling back to a generic label
    #[must_use]
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("Untitled listing")
    }

    /// Price formatted as dollars, e.g. `$12.05`
    #[must_use]
    pub fn display_price(&self) -> Option<String> {
        let cents = self.price_cents?;
        let sign = if cents < 0 { "-" } else { "" };
        let cents = cents.unsigned_abs();
        Some(format!("{sign}${}.{:02}", cents / 100, cents % 100))
    }
}

/// A favorite or recent view of a catalog listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedItem {
    /// Client-generated, replaced by the server id once adopted from remote
    pub id: SavedItemId,
    pub kind: SavedKind,
    /// Referenced listing
    pub subject_id: String,
    #[serde(default)]
    pub snapshot: Option<ListingSnapshot>,
    /// Creation/refresh timestamp (Unix ms)
    pub timestamp: i64,
    /// True only once the server has durably accepted this exact timestamp
    #[serde(default)]
    pub synced: bool,
}

impl SavedItem {
    /// Create a new, not yet synced item
    #[must_use]
    pub fn new(
        kind: SavedKind,
        subject_id: impl Into<String>,
        snapshot: Option<ListingSnapshot>,
        timestamp: i64,
    ) -> Self {
        Self {
            id: SavedItemId::new(),
            kind,
            subject_id: subject_id.into(),
            snapshot,
            timestamp,
            synced: false,
        }
    }

    /// Title for display, tolerating a missing snapshot
    #[must_use]
    pub fn display_title(&self) -> &str {
        self.snapshot
            .as_ref()
            .map_or("Untitled listing", ListingSnapshot::display_title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saved_item_id_unique() {
        assert_ne!(SavedItemId::new(), SavedItemId::new());
    }

    #[test]
    fn saved_item_id_parse() {
        let id = SavedItemId::new();
        let parsed: SavedItemId = id.as_str().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn new_item_starts_unsynced() {
        let item = SavedItem::new(SavedKind::Favorite, "sku-1", None, 42);
        assert!(!item.synced);
        assert_eq!(item.timestamp, 42);
        assert_eq!(item.display_title(), "Untitled listing");
    }

    #[test]
    fn display_price_formats_cents() {
        let snapshot = ListingSnapshot {
            price_cents: Some(1205),
            ..ListingSnapshot::default()
        };
        assert_eq!(snapshot.display_price().as_deref(), Some("$12.05"));

        let negative = ListingSnapshot {
            price_cents: Some(-7),
            ..ListingSnapshot::default()
        };
        assert_eq!(negative.display_price().as_deref(), Some("-$0.07"));
        assert_eq!(ListingSnapshot::default().display_price(), None);
    }

    #[test]
    fn empty_snapshot_collapses_to_none() {
        assert!(ListingSnapshot::default().non_empty().is_none());
        let titled = ListingSnapshot {
            title: Some("Honey".to_string()),
            ..ListingSnapshot::default()
        };
        assert_eq!(titled.clone().non_empty(), Some(titled));
    }

    #[test]
    fn deserializes_item_without_optional_fields() {
        let raw = format!(
            r#"{{"id":"{}","kind":"recent_view","subject_id":"sku-9","timestamp":7}}"#,
            SavedItemId::new()
        );
        let item: SavedItem = serde_json::from_str(&raw).unwrap();
        assert_eq!(item.kind, SavedKind::RecentView);
        assert!(item.snapshot.is_none());
        assert!(!item.synced);
    }
}
