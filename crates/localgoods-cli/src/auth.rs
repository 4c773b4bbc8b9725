//! Keeps the signed-in session in the OS keychain between CLI runs.
//!
//! Tests swap the keychain for a process-wide map so they never touch the
//! real credential store.

use std::time::Duration;

use localgoods_core::auth::{AuthClient, AuthResult, SessionPersistence};
pub use localgoods_core::auth::{AuthError, AuthSession};
use localgoods_core::config::BackendConfig;

const KEYCHAIN_SERVICE: &str = "localgoods-cli";
const KEYCHAIN_ACCOUNT: &str = "supabase_session";

/// One keychain slot holding a JSON-encoded [`AuthSession`]
#[derive(Clone)]
pub struct SessionStore {
    account: String,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self {
            account: KEYCHAIN_ACCOUNT.to_string(),
        }
    }
}

impl SessionStore {
    #[cfg(test)]
    pub fn named(account: &str) -> Self {
        Self {
            account: account.to_string(),
        }
    }
}

impl SessionPersistence for SessionStore {
    fn load_session(&self) -> AuthResult<Option<AuthSession>> {
        keychain::read(&self.account)?
            .map(|raw| serde_json::from_str(&raw))
            .transpose()
            .map_err(AuthError::from)
    }

    fn save_session(&self, session: &AuthSession) -> AuthResult<()> {
        keychain::write(&self.account, &serde_json::to_string(session)?)
    }

    fn clear_session(&self) -> AuthResult<()> {
        keychain::delete(&self.account)
    }
}

#[cfg(not(test))]
mod keychain {
    use keyring::Entry;

    use super::{AuthError, AuthResult, KEYCHAIN_SERVICE};

    fn entry(account: &str) -> AuthResult<Entry> {
        Entry::new(KEYCHAIN_SERVICE, account).map_err(storage_error)
    }

    #[allow(clippy::needless_pass_by_value)]
    fn storage_error(error: keyring::Error) -> AuthError {
        AuthError::SecureStorage(error.to_string())
    }

    pub fn read(account: &str) -> AuthResult<Option<String>> {
        match entry(account)?.get_password() {
            Ok(raw) => Ok(Some(raw)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(error) => Err(storage_error(error)),
        }
    }

    pub fn write(account: &str, raw: &str) -> AuthResult<()> {
        entry(account)?.set_password(raw).map_err(storage_error)
    }

    pub fn delete(account: &str) -> AuthResult<()> {
        match entry(account)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(error) => Err(storage_error(error)),
        }
    }
}


pub type CliAuthClient = AuthClient<SessionStore>;

pub fn auth_client(backend: &BackendConfig, timeout: Duration) -> AuthResult<CliAuthClient> {
    AuthClient::new(
        backend.auth_url(),
        backend.supabase_anon_key.clone(),
        SessionStore::default(),
        timeout,
    )
}

/// Stored session, refreshed when a backend is configured.
///
/// Failures are logged and read as signed out.
pub async fn restore_session(auth: Option<&CliAuthClient>) -> Option<AuthSession> {
    let restored = match auth {
        Some(client) => client.restore_session().await,
        None => SessionStore::default().load_session(),
    };
    match restored {
        Ok(session) => session,
        Err(error) => {
            tracing::warn!("Could not restore session, continuing signed out: {}", error);
            None
        }
    }
}

pub fn clear_stored_session() -> AuthResult<()> {
    SessionStore::default().clear_session()
}
