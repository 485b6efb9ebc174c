//! Configuration loader with file and environment variable support

use crate::{AppConfig, ConfigError};
use std::env;
use std::path::PathBuf;
use tracing::info;

/// Standard config file search paths
const CONFIG_PATHS: &[&str] = &[
    "mediturnos.toml",
    "config.toml",
    "./config/mediturnos.toml",
    "/etc/mediturnos/config.toml",
];

/// Configuration loader
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Create a loader with a specific config file path
    pub fn with_path<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            config_path: Some(path.into()),
        }
    }

    /// Load configuration from file (if found) with environment variable overrides
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let mut config = AppConfig::default();

        if let Some(path) = self.find_config_file() {
            info!(?path, "Loading configuration from file");
            config = AppConfig::from_file(&path)?;
        }

        apply_env_overrides(&mut config, |key| env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    fn find_config_file(&self) -> Option<PathBuf> {
        if let Some(path) = &self.config_path {
            if path.exists() {
                return Some(path.clone());
            }
        }

        if let Ok(path) = env::var("MEDITURNOS_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        CONFIG_PATHS
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply `MEDITURNOS_*` overrides. Unparseable numbers are ignored.
fn apply_env_overrides<F>(config: &mut AppConfig, var: F)
where
    F: Fn(&str) -> Option<String>,
{
    // API
    if let Some(val) = var("MEDITURNOS_API_BASE_URL") {
        config.api.base_url = val.trim_end_matches('/').to_string();
    }
    if let Some(val) = var("MEDITURNOS_API_TIMEOUT_SECS") {
        if let Ok(secs) = val.parse() {
            config.api.timeout_secs = secs;
        }
    }
    if let Some(val) = var("MEDITURNOS_LOGIN_PATH") {
        config.api.login_path = val;
    }

    // Storage
    if let Some(val) = var("MEDITURNOS_STORAGE_BACKEND") {
        config.storage.backend = val;
    }
    if let Some(val) = var("MEDITURNOS_STORAGE_PATH") {
        config.storage.path = val;
    }

    // Cache
    if let Some(val) = var("MEDITURNOS_CACHE_RETRY_DELAY_MS") {
        if let Ok(delay) = val.parse() {
            config.cache.retry_delay_ms = delay;
        }
    }
}
