//! Supabase auth client and the signed-in session type.

use std::fmt;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::util::unix_timestamp_now;

const EXPIRY_SKEW_SECONDS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
}

/// A signed-in user and the bearer token remote calls are made with.
///
/// `Debug` omits both tokens.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix seconds
    pub expires_at: i64,
    pub user: AuthUser,
}

impl AuthSession {
    /// True shortly before the real expiry so in-flight calls don't race it
    pub fn is_expired(&self) -> bool {
        self.expires_at <= unix_timestamp_now() + EXPIRY_SKEW_SECONDS
    }

    pub fn user_id(&self) -> &str {
        &self.user.id
    }
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSession")
            .field("user", &self.user)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("No Supabase project is configured for sign-in")]
    NotConfigured,
    #[error("Bad auth settings: {0}")]
    InvalidConfiguration(&'static str),
    #[error("Auth request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Unreadable auth payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Sign-in rejected: {0}")]
    Api(String),
    #[error("Could not access the session keychain: {0}")]
    SecureStorage(String),
}

pub type AuthResult<T> = Result<T, AuthError>;

/// Where a client keeps its session between runs
pub trait SessionPersistence: Send + Sync {
    fn load_session(&self) -> AuthResult<Option<AuthSession>>;
    fn save_session(&self, session: &AuthSession) -> AuthResult<()>;
    fn clear_session(&self) -> AuthResult<()>;
}

/// Body of a `POST /token` call
enum TokenGrant<'a> {
    Password { email: &'a str, password: &'a str },
    Refresh { refresh_token: &'a str },
}

impl TokenGrant<'_> {
    const fn grant_type(&self) -> &'static str {
        match self {
            Self::Password { .. } => "password",
            Self::Refresh { .. } => "refresh_token",
        }
    }

    fn payload(&self) -> serde_json::Value {
        match self {
            Self::Password { email, password } => {
                serde_json::json!({ "email": email, "password": password })
            }
            Self::Refresh { refresh_token } => {
                serde_json::json!({ "refresh_token": refresh_token })
            }
        }
    }
}

/// Email/password client for the Supabase `/auth/v1` API.
///
/// Every session it obtains is handed to `S` before being returned.
pub struct AuthClient<S: SessionPersistence> {
    auth_url: String,
    anon_key: String,
    http: Client,
    sessions: S,
}

impl<S: SessionPersistence> AuthClient<S> {
    /// `timeout` bounds every request, connect included
    pub fn new(
        auth_url: impl Into<String>,
        anon_key: impl Into<String>,
        sessions: S,
        timeout: Duration,
    ) -> AuthResult<Self> {
        let anon_key = anon_key.into().trim().to_string();
        if anon_key.is_empty() {
            return Err(AuthError::InvalidConfiguration("anon key is empty"));
        }
        if timeout.is_zero() {
            return Err(AuthError::InvalidConfiguration("request timeout is zero"));
        }

        Ok(Self {
            auth_url: auth_url.into().trim_end_matches('/').to_string(),
            anon_key,
            http: Client::builder().timeout(timeout).build()?,
            sessions,
        })
    }

    /// Persisted session, refreshed first when its token has lapsed.
    ///
    /// A lapsed session whose refresh fails is forgotten and `None` returned.
    pub async fn restore_session(&self) -> AuthResult<Option<AuthSession>> {
        let Some(stored) = self.sessions.load_session()? else {
            return Ok(None);
        };
        if !stored.is_expired() {
            return Ok(Some(stored));
        }

        let refreshed = self
            .exchange(TokenGrant::Refresh {
                refresh_token: &stored.refresh_token,
            })
            .await;
        match refreshed {
            Ok(session) => Ok(Some(session)),
            Err(error) => {
                tracing::warn!(user_id = stored.user_id(), "Dropping stored session: {}", error);
                self.sessions.clear_session()?;
                Ok(None)
            }
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthSession> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::Api("email and password are required".to_string()));
        }
        self.exchange(TokenGrant::Password { email, password }).await
    }

    /// Revokes the token server-side when possible; the local copy is always
    /// cleared
    pub async fn sign_out(&self, session: &AuthSession) -> AuthResult<()> {
        let revoked = self
            .http
            .post(format!("{}/logout", self.auth_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(&session.access_token)
            .send()
            .await;

        match revoked {
            Ok(response) if response.status().is_success() => {}
            // Already revoked or expired
            Ok(response) if response.status() == StatusCode::UNAUTHORIZED => {}
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                tracing::warn!("Logout was not acknowledged: {}", parse_api_error(status, &body));
            }
            Err(error) => tracing::warn!("Logout request failed: {}", error),
        }

        self.sessions.clear_session()
    }

    async fn exchange(&self, grant: TokenGrant<'_>) -> AuthResult<AuthSession> {
        let response = self
            .http
            .post(format!("{}/token", self.auth_url))
            .query(&[("grant_type", grant.grant_type())])
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
            .json(&grant.payload())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Api(parse_api_error(status, &body)));
        }

        let session = AuthSession::try_from(response.json::<TokenResponse>().await?)?;
        self.sessions.save_session(&session)?;
        tracing::debug!(user_id = session.user_id(), grant = grant.grant_type(), "Obtained session");
        Ok(session)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_at: Option<i64>,
    expires_in: Option<i64>,
    user: Option<AuthUser>,
}

impl TryFrom<TokenResponse> for AuthSession {
    type Error = AuthError;

    fn try_from(response: TokenResponse) -> AuthResult<Self> {
        let missing = || AuthError::Api("token response carried no session".to_string());
        let expires_at = response
            .expires_at
            .or_else(|| {
                response
                    .expires_in
                    .map(|seconds| unix_timestamp_now().saturating_add(seconds))
            })
            .ok_or_else(missing)?;

        Ok(Self {
            access_token: response.access_token.ok_or_else(missing)?,
            refresh_token: response.refresh_token.ok_or_else(missing)?,
            expires_at,
            user: response.user.ok_or_else(missing)?,
        })
    }
}

/// Supabase reports failures under several field names depending on the
/// service (GoTrue vs PostgREST)
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ApiErrorBody {
    message: Option<String>,
    msg: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
    hint: Option<String>,
}

/// Human-readable `message (status)` for a failed Supabase response
pub(crate) fn parse_api_error(status: StatusCode, body: &str) -> String {
    let code = status.as_u16();
    let parsed = serde_json::from_str::<ApiErrorBody>(body).ok().and_then(|payload| {
        let hint = payload.hint;
        [payload.message, payload.msg, payload.error_description, payload.error]
            .into_iter()
            .flatten()
            .map(|message| message.trim().to_string())
            .find(|message| !message.is_empty())
            .map(|message| match hint {
                Some(hint) if !hint.trim().is_empty() => format!("{message}; {}", hint.trim()),
                _ => message,
            })
    });

    match parsed {
        Some(message) => format!("{message} ({code})"),
        None if body.trim().is_empty() => format!("HTTP {code}"),
        None => format!("{} ({code})", crate::util::compact_text(body)),
    }
}
