use crate::types::*;
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::PathBuf;

pub const APP_NAME: &str = "ghstore";
pub const CONFIG_DIR_NAME: &str = ".ghstore";
pub const CONFIG_FILE_NAME: &str = "config.json";
pub const REGISTRY_FILE_NAME: &str = "installed.json";
pub const TOKEN_FILE_NAME: &str = "token";
pub const DIRECTORY_FALLBACK_NAME: &str = "repos.json";

pub const SETTING_KEYS: [&str; 8] = [
    "cache_ttl_secs",
    "cache_max_entries",
    "refresh_interval_secs",
    "page_size",
    "directory_url",
    "directory_fallback",
    "api_base",
    "dedup",
];

pub fn get_user_data_dir() -> Result<PathBuf> {
    let path = match std::env::var_os("GHSTORE_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => dirs::data_dir()
            .ok_or_else(|| anyhow!("Could not determine data directory"))?
            .join(APP_NAME),
    };
    tracing::debug!("User data directory: {}", path.display());
    fs::create_dir_all(&path)?;
    Ok(path)
}

pub fn get_user_config_dir() -> Result<PathBuf> {
    let path = match std::env::var_os("GHSTORE_CONFIG_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?
            .join(CONFIG_DIR_NAME),
    };
    fs::create_dir_all(&path)?;
    Ok(path)
}

pub fn get_config_file_path() -> Result<PathBuf> {
    let path = get_user_config_dir()?.join(CONFIG_FILE_NAME);
    tracing::debug!("Config file path: {}", path.display());
    Ok(path)
}

pub fn get_registry_file_path() -> Result<PathBuf> {
    Ok(get_user_data_dir()?.join(REGISTRY_FILE_NAME))
}

pub fn get_token_file_path() -> Result<PathBuf> {
    Ok(get_user_config_dir()?.join(TOKEN_FILE_NAME))
}

/// Configured fallback, else `repos.json` next to the config file when present.
pub fn get_directory_fallback(settings: &StoreSettings) -> Result<Option<PathBuf>> {
    if let Some(path) = &settings.directory_fallback {
        return Ok(Some(PathBuf::from(path)));
    }
    let default = get_user_config_dir()?.join(DIRECTORY_FALLBACK_NAME);
    Ok(default.exists().then_some(default))
}

/// The config file as written, without environment overrides.
pub fn load_store_config() -> Result<StoreConfig> {
    let config_path = get_config_file_path()?;

    if !config_path.exists() {
        return Ok(StoreConfig::default());
    }

    let content = fs::read_to_string(&config_path)
        .with_context(|| format!("Could not read config file at {}", config_path.display()))?;
    serde_json::from_str(&content).with_context(|| "Could not parse config file as JSON")
}

/// Settings in effect: the config file with `GHSTORE_*` overrides applied.
pub fn effective_settings(config: &StoreConfig) -> StoreSettings {
    let mut settings = config.settings.clone();
    apply_env_overrides(&mut settings);
    settings
}

fn apply_env_overrides(settings: &mut StoreSettings) {
    if let Ok(ttl) = std::env::var("GHSTORE_CACHE_TTL_SECS") {
        if let Ok(ttl) = ttl.parse::<u64>() {
            settings.cache_ttl_secs = ttl;
        }
    }

    if let Ok(size) = std::env::var("GHSTORE_PAGE_SIZE") {
        if let Ok(size) = size.parse::<usize>() {
            settings.page_size = size;
        }
    }

    if let Ok(url) = std::env::var("GHSTORE_DIRECTORY_URL") {
        settings.directory_url = url;
    }

    if let Ok(path) = std::env::var("GHSTORE_DIRECTORY_FALLBACK") {
        settings.directory_fallback = Some(path);
    }

    if let Ok(base) = std::env::var("GHSTORE_API_BASE") {
        settings.api_base = base;
    }
}

pub fn save_store_config(config: &StoreConfig) -> Result<()> {
    let config_path = get_config_file_path()?;
    let config_dir = config_path
        .parent()
        .ok_or_else(|| anyhow!("Invalid config path"))?;

    fs::create_dir_all(config_dir)?;

    let content = serde_json::to_string_pretty(config)?;
    fs::write(&config_path, content)?;

    Ok(())
}

pub fn get_setting(settings: &StoreSettings, key: &str) -> Option<String> {
    let value = match normalize_key(key).as_str() {
        "cache_ttl_secs" => settings.cache_ttl_secs.to_string(),
        "cache_max_entries" => settings.cache_max_entries.to_string(),
        "refresh_interval_secs" => settings.refresh_interval_secs.to_string(),
        "page_size" => settings.page_size.to_string(),
        "directory_url" => settings.directory_url.clone(),
        "directory_fallback" => settings.directory_fallback.clone().unwrap_or_default(),
        "api_base" => settings.api_base.clone(),
        "dedup" => settings.dedup.to_string(),
        _ => return None,
    };
    Some(value)
}

pub fn set_setting(settings: &mut StoreSettings, key: &str, value: &str) -> Result<()> {
    let key = normalize_key(key);
    let invalid = |e: &dyn std::fmt::Display| anyhow!("Invalid value for '{}': {}", key, e);

    match key.as_str() {
        "cache_ttl_secs" => settings.cache_ttl_secs = value.parse::<u64>().map_err(|e| invalid(&e))?,
        "cache_max_entries" => {
            settings.cache_max_entries = value.parse::<usize>().map_err(|e| invalid(&e))?
        }
        "refresh_interval_secs" => {
            settings.refresh_interval_secs = value.parse::<u64>().map_err(|e| invalid(&e))?
        }
        "page_size" => settings.page_size = value.parse::<usize>().map_err(|e| invalid(&e))?,
        "directory_url" => settings.directory_url = value.to_string(),
        "directory_fallback" => settings.directory_fallback = Some(value.to_string()),
        "api_base" => settings.api_base = value.to_string(),
        "dedup" => settings.dedup = value.parse::<DedupPolicy>().map_err(|e| invalid(&e))?,
        _ => {
            return Err(anyhow!(
                "'{}' is not a valid configuration setting. Valid settings: {}",
                key,
                SETTING_KEYS.join(", ")
            ))
        }
    }
    Ok(())
}

pub fn unset_setting(settings: &mut StoreSettings, key: &str) -> Result<()> {
    let defaults = StoreSettings::default();
    match normalize_key(key).as_str() {
        "cache_ttl_secs" => settings.cache_ttl_secs = defaults.cache_ttl_secs,
        "cache_max_entries" => settings.cache_max_entries = defaults.cache_max_entries,
        "refresh_interval_secs" => settings.refresh_interval_secs = defaults.refresh_interval_secs,
        "page_size" => settings.page_size = defaults.page_size,
        "directory_url" => settings.directory_url = defaults.directory_url,
        "directory_fallback" => settings.directory_fallback = defaults.directory_fallback,
        "api_base" => settings.api_base = defaults.api_base,
        "dedup" => settings.dedup = defaults.dedup,
        other => {
            return Err(anyhow!(
                "'{}' is not a valid configuration setting. Valid settings: {}",
                other,
                SETTING_KEYS.join(", ")
            ))
        }
    }
    Ok(())
}

pub fn normalize_key(key: &str) -> String {
    key.replace('-', "_")
        .chars()
        .map(|c| {
            if c.is_ascii_uppercase() {
                format!("_{}", c.to_lowercase())
            } else {
                c.to_string()
            }
        })
        .collect::<String>()
        .to_lowercase()
}
