//! Error types for localgoods-core

use thiserror::Error;

use crate::auth::AuthError;
use crate::remote::RemoteError;
use crate::storage::StorageError;

/// Result type alias using localgoods-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in localgoods-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Local key-value storage error
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Remote saved-items store error
    #[error("Remote store error: {0}")]
    Remote(#[from] RemoteError),

    /// Session/auth error
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
