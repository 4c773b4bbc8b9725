use std::env;

use localgoods_core::util::normalize_text_option;
use serde_json::json;

use crate::cli::ConfigCommands;
use crate::config::{default_config_path, resolve_backend, CliConfig};
use crate::error::CliError;

pub fn run_config(command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            supabase_url,
            supabase_anon_key,
        } => run_config_init(supabase_url, supabase_anon_key),
        ConfigCommands::Show => run_config_show(),
    }
}

/// Explicit flags win, then environment, then what the file already holds
pub fn merge_backend_settings(
    existing: &CliConfig,
    supabase_url: Option<String>,
    supabase_anon_key: Option<String>,
    env_url: Option<String>,
    env_anon_key: Option<String>,
) -> CliConfig {
    CliConfig {
        supabase_url: normalize_text_option(supabase_url)
            .or_else(|| normalize_text_option(env_url))
            .or_else(|| existing.supabase_url.clone()),
        supabase_anon_key: normalize_text_option(supabase_anon_key)
            .or_else(|| normalize_text_option(env_anon_key))
            .or_else(|| existing.supabase_anon_key.clone()),
        ..existing.clone()
    }
}

fn run_config_init(
    supabase_url: Option<String>,
    supabase_anon_key: Option<String>,
) -> Result<(), CliError> {
    let existing = CliConfig::load().map_err(CliError::Config)?;
    let config = merge_backend_settings(
        &existing,
        supabase_url,
        supabase_anon_key,
        env::var("SUPABASE_URL").ok(),
        env::var("SUPABASE_ANON_KEY").ok(),
    );
    if resolve_backend(&config, None, None)?.is_none() {
        return Err(CliError::BackendNotConfigured);
    }

    let path = config.save().map_err(CliError::Config)?;
    println!("Saved configuration to {}", path.display());
    Ok(())
}

fn run_config_show() -> Result<(), CliError> {
    let config = CliConfig::load().map_err(CliError::Config)?;
    let backend = config.backend()?;
    let path = default_config_path().map_err(CliError::Config)?;

    let rendered = json!({
        "config_path": path.display().to_string(),
        "supabase_url": backend.as_ref().map(|backend| backend.supabase_url.clone()),
        "supabase_anon_key": backend.as_ref().map(|backend| mask_secret(&backend.supabase_anon_key)),
        "smart_save": config.smart_save,
    });
    println!("{}", serde_json::to_string_pretty(&rendered)?);
    Ok(())
}

pub fn mask_secret(secret: &str) -> String {
    let visible = secret.chars().take(4).collect::<String>();
    if secret.chars().count() <= 8 {
        "****".to_string()
    } else {
        format!("{visible}****")
    }
}
