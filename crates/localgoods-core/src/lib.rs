//! localgoods-core - Core library for Local Goods
//!
//! Smart Save: the offline-first favorites and recently viewed store shared
//! by every Local Goods client. State lives on the device first and is
//! reconciled with the managed backend whenever a signed-in session exists.

pub mod auth;
pub mod config;
pub mod error;
pub mod local_store;
pub mod models;
pub mod notify;
pub mod remote;
pub mod session;
pub mod smart_save;
pub mod state;
pub mod storage;
pub mod util;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{Error, Result};
pub use models::{ListingSnapshot, SavedItem, SavedItemId, SavedKind};
pub use smart_save::{ReconcileReport, SmartSave, SyncError};
pub use state::SyncState;
