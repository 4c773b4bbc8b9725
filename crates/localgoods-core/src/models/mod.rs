//! Data models for Local Goods saved listings

mod pending_op;
mod saved_item;

pub use pending_op::PendingOp;
pub use saved_item::{ListingSnapshot, SavedItem, SavedItemId, SavedKind};
