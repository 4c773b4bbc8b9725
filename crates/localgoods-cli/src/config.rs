//! Persistent CLI configuration.

use std::env;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use localgoods_core::auth::AuthError;
use localgoods_core::config::{BackendConfig, SmartSaveConfig};
use localgoods_core::util::normalize_text_option;
use serde::{Deserialize, Serialize};

const APP_DIR_NAME: &str = "localgoods";
const CONFIG_FILE: &str = "cli-config.json";
const DB_FILE: &str = "localgoods.db";

const CONFIG_VERSION: u32 = 1;

/// Contents of `cli-config.json`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CliConfig {
    pub version: u32,
    /// Supabase project URL; `SUPABASE_URL` overrides it
    pub supabase_url: Option<String>,
    /// `SUPABASE_ANON_KEY` overrides it
    pub supabase_anon_key: Option<String>,
    pub smart_save: SmartSaveConfig,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            supabase_url: None,
            supabase_anon_key: None,
            smart_save: SmartSaveConfig::default(),
        }
    }
}

pub fn default_config_path() -> Result<PathBuf, String> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILE))
        .ok_or_else(|| "Failed to resolve CLI config directory".to_string())
}

/// Default location of the saved-items database
pub fn default_db_path() -> Result<PathBuf, String> {
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR_NAME).join(DB_FILE))
        .ok_or_else(|| "Failed to resolve CLI data directory".to_string())
}

/// `--db-path`, then `LOCALGOODS_DB_PATH`, then the platform data dir
pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> Result<PathBuf, String> {
    cli_db_path
        .or_else(|| env::var_os("LOCALGOODS_DB_PATH").map(PathBuf::from))
        .map_or_else(default_db_path, Ok)
}

fn describe(action: &str, path: &Path, error: impl std::fmt::Display) -> String {
    format!("Could not {action} {}: {error}", path.display())
}

impl CliConfig {
    pub fn load() -> Result<Self, String> {
        Self::load_from_path(&default_config_path()?)
    }

    /// A missing file yields the defaults; a malformed one is an error
    pub fn load_from_path(path: &Path) -> Result<Self, String> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(error) => return Err(describe("read", path, error)),
        };

        let config = serde_json::from_str::<Self>(&raw)
            .map_err(|error| describe("parse", path, error))?
            .normalized();
        config
            .smart_save
            .validate()
            .map_err(|error| describe("use", path, error))?;
        Ok(config)
    }

    /// Writes to the default location and returns it
    pub fn save(&self) -> Result<PathBuf, String> {
        let path = default_config_path()?;
        self.save_to_path(&path).map(|()| path)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), String> {
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|error| describe("create", dir, error))?;
        }
        let json = serde_json::to_string_pretty(&self.clone().normalized())
            .map_err(|error| describe("encode", path, error))?;
        std::fs::write(path, json).map_err(|error| describe("write", path, error))
    }

    /// Backend endpoints, with `SUPABASE_URL` / `SUPABASE_ANON_KEY` taking
    /// precedence over the file
    pub fn backend(&self) -> Result<Option<BackendConfig>, AuthError> {
        resolve_backend(
            self,
            env::var("SUPABASE_URL").ok(),
            env::var("SUPABASE_ANON_KEY").ok(),
        )
    }

    fn normalized(self) -> Self {
        Self {
            supabase_url: normalize_text_option(self.supabase_url),
            supabase_anon_key: normalize_text_option(self.supabase_anon_key),
            ..self
        }
    }
}

pub fn resolve_backend(
    config: &CliConfig,
    env_url: Option<String>,
    env_anon_key: Option<String>,
) -> Result<Option<BackendConfig>, AuthError> {
    BackendConfig::resolve_optional(
        normalize_text_option(env_url).or_else(|| config.supabase_url.clone()),
        normalize_text_option(env_anon_key).or_else(|| config.supabase_anon_key.clone()),
    )
}
