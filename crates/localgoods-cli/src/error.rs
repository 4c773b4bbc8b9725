use std::io;

use localgoods_core::auth::AuthError;
use localgoods_core::remote::RemoteError;
use localgoods_core::storage::StorageError;
use localgoods_core::SyncError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] localgoods_core::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Listing ID cannot be empty")]
    EmptyListingId,
    #[error("Configuration error: {0}")]
    Config(String),
    #[error(
        "Sync is not configured. Run `localgoods config init` or set SUPABASE_URL and SUPABASE_ANON_KEY."
    )]
    BackendNotConfigured,
    #[error("Sync finished with errors: {0}")]
    SyncIncomplete(String),
    #[error("Refusing to delete local data without --yes")]
    ResetNotConfirmed,
}
