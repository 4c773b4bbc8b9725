//! Client configuration.
//!
//! `SmartSaveConfig` tunes the saved-items store; `BackendConfig` locates the
//! managed backend. Both are plain serde structs so every client can embed
//! them in its own config file.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::auth::AuthError;
use crate::util::{is_http_url, normalize_text_option};
use crate::{Error, Result};

const DEFAULT_FAVORITES_CAP: usize = 200;
const DEFAULT_RECENT_VIEWS_CAP: usize = 50;
const DEFAULT_REMOTE_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_NUDGE_INTERVAL_HOURS: u64 = 7 * 24;
const DEFAULT_NAMESPACE: &str = "localgoods";

/// Tunables for the saved-items store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct SmartSaveConfig {
    /// Maximum number of favorites kept; oldest are evicted
    pub favorites_cap: usize,
    /// Maximum number of recent views kept; oldest are evicted
    pub recent_views_cap: usize,
    /// Upper bound for a single remote call
    pub remote_timeout_ms: u64,
    /// Minimum gap between two "sign in to sync" nudges
    pub sign_in_nudge_interval_hours: u64,
    /// Prefix of every local storage key
    pub storage_namespace: String,
}

impl Default for SmartSaveConfig {
    fn default() -> Self {
        Self {
            favorites_cap: DEFAULT_FAVORITES_CAP,
            recent_views_cap: DEFAULT_RECENT_VIEWS_CAP,
            remote_timeout_ms: DEFAULT_REMOTE_TIMEOUT_MS,
            sign_in_nudge_interval_hours: DEFAULT_NUDGE_INTERVAL_HOURS,
            storage_namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }
}

impl SmartSaveConfig {
    pub fn validate(&self) -> Result<()> {
        if self.favorites_cap == 0 {
            return Err(Error::Config("favorites_cap must be at least 1".to_string()));
        }
        if self.recent_views_cap == 0 {
            return Err(Error::Config(
                "recent_views_cap must be at least 1".to_string(),
            ));
        }
        if self.remote_timeout_ms == 0 {
            return Err(Error::Config(
                "remote_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.storage_namespace.trim().is_empty() {
            return Err(Error::Config(
                "storage_namespace must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub const fn remote_timeout(&self) -> Duration {
        Duration::from_millis(self.remote_timeout_ms)
    }

    pub fn nudge_interval_ms(&self) -> i64 {
        i64::try_from(self.sign_in_nudge_interval_hours)
            .unwrap_or(i64::MAX)
            .saturating_mul(60 * 60 * 1000)
    }
}

/// Supabase project endpoints
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BackendConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
}

impl BackendConfig {
    /// Both values absent means local-only mode; only one of them is an error.
    pub fn resolve_optional(
        url: Option<String>,
        anon_key: Option<String>,
    ) -> std::result::Result<Option<Self>, AuthError> {
        let url = normalize_text_option(url);
        let anon_key = normalize_text_option(anon_key);

        match (url, anon_key) {
            (None, None) => Ok(None),
            (Some(url), Some(anon_key)) => {
                if !is_http_url(&url) {
                    return Err(AuthError::InvalidConfiguration(
                        "Supabase URL must include http:// or https://",
                    ));
                }
                Ok(Some(Self {
                    supabase_url: url.trim_end_matches('/').to_string(),
                    supabase_anon_key: anon_key,
                }))
            }
            _ => Err(AuthError::NotConfigured),
        }
    }

    fn base_url(&self) -> &str {
        let trimmed = self.supabase_url.trim().trim_end_matches('/');
        trimmed
            .strip_suffix("/auth/v1")
            .or_else(|| trimmed.strip_suffix("/rest/v1"))
            .unwrap_or(trimmed)
    }

    pub fn auth_url(&self) -> String {
        format!("{}/auth/v1", self.base_url())
    }

    pub fn rest_url(&self) -> String {
        format!("{}/rest/v1", self.base_url())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = SmartSaveConfig::default();
        config.validate().unwrap();
        assert!(config.favorites_cap > config.recent_views_cap);
        assert_eq!(config.remote_timeout(), Duration::from_secs(5));
        assert_eq!(config.nudge_interval_ms(), 7 * 24 * 60 * 60 * 1000);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: SmartSaveConfig = serde_json::from_str(r#"{"recent_views_cap": 5}"#).unwrap();
        assert_eq!(config.recent_views_cap, 5);
        assert_eq!(config.favorites_cap, DEFAULT_FAVORITES_CAP);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let error = serde_json::from_str::<SmartSaveConfig>(r#"{"favourites_cap": 5}"#).unwrap_err();
        assert!(error.to_string().contains("unknown field"));
    }

    #[test]
    fn validate_rejects_zero_caps_and_empty_namespace() {
        let zero_cap = SmartSaveConfig {
            favorites_cap: 0,
            ..SmartSaveConfig::default()
        };
        assert!(zero_cap.validate().is_err());

        let blank = SmartSaveConfig {
            storage_namespace: "  ".to_string(),
            ..SmartSaveConfig::default()
        };
        assert!(blank.validate().is_err());
    }

    #[test]
    fn backend_resolution_requires_both_values() {
        assert_eq!(BackendConfig::resolve_optional(None, None).unwrap(), None);
        assert!(matches!(
            BackendConfig::resolve_optional(Some("https://p.supabase.co".to_string()), None),
            Err(AuthError::NotConfigured)
        ));
        assert!(BackendConfig::resolve_optional(
            Some("p.supabase.co".to_string()),
            Some("anon".to_string())
        )
        .is_err());
    }

    #[test]
    fn backend_derives_service_urls() {
        let config = BackendConfig::resolve_optional(
            Some(" https://p.supabase.co/auth/v1/ ".to_string()),
            Some("anon".to_string()),
        )
        .unwrap()
        .unwrap();
        assert_eq!(config.auth_url(), "https://p.supabase.co/auth/v1");
        assert_eq!(config.rest_url(), "https://p.supabase.co/rest/v1");
    }
}
