//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (REQCACHE_*)
//! 2. TOML config file (if REQCACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::settings::CacheSettings;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (REQCACHE_*)
/// 2. TOML config file (if REQCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to SQLite cache database.
    ///
    /// Set via REQCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Seconds a cached response stays fresh.
    ///
    /// Set via REQCACHE_EXPIRE_AFTER_SECONDS environment variable.
    #[serde(default = "default_expire_after_seconds")]
    pub expire_after_seconds: i64,

    /// Request methods eligible for caching.
    #[serde(default = "default_allowable_methods")]
    pub allowable_methods: Vec<String>,

    /// Response status codes eligible for caching.
    #[serde(default = "default_allowable_status_codes")]
    pub allowable_status_codes: Vec<u16>,

    /// Serve expired responses when the network fails.
    ///
    /// Set via REQCACHE_STALE_IF_ERROR environment variable.
    #[serde(default)]
    pub stale_if_error: bool,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via REQCACHE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via REQCACHE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum number of redirects the transport follows.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./reqcache.sqlite")
}

fn default_expire_after_seconds() -> i64 {
    CacheSettings::DEFAULT_EXPIRE_AFTER_SECONDS
}

fn default_allowable_methods() -> Vec<String> {
    vec!["GET".into(), "HEAD".into()]
}

fn default_allowable_status_codes() -> Vec<u16> {
    vec![200]
}

fn default_user_agent() -> String {
    "reqcache/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_redirects() -> usize {
    5
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            expire_after_seconds: default_expire_after_seconds(),
            allowable_methods: default_allowable_methods(),
            allowable_status_codes: default_allowable_status_codes(),
            stale_if_error: false,
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_redirects: default_max_redirects(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `REQCACHE_`
    /// 2. TOML file from `REQCACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("REQCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        Self::extract(figment.merge(
            Env::prefixed("REQCACHE_")
                .ignore(&["config_file"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        ))
    }

    /// Extract and validate a config from an assembled figment.
    pub fn extract(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Cache policy described by this configuration.
    pub fn cache_settings(&self) -> CacheSettings {
        CacheSettings::new(
            self.expire_after_seconds,
            self.allowable_methods.iter().map(|m| m.to_ascii_uppercase()),
            self.allowable_status_codes.iter().copied(),
            self.stale_if_error,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.db_path, PathBuf::from("./reqcache.sqlite"));
        assert_eq!(config.expire_after_seconds, 3600);
        assert_eq!(config.allowable_methods, vec!["GET".to_string(), "HEAD".to_string()]);
        assert_eq!(config.allowable_status_codes, vec![200]);
        assert!(!config.stale_if_error);
        assert_eq!(config.user_agent, "reqcache/0.1");
        assert_eq!(config.timeout_ms, 20_000);
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
    }

    #[test]
    fn test_cache_settings_from_config() {
        let config = AppConfig {
            expire_after_seconds: 120,
            allowable_methods: vec!["get".into(), "POST".into()],
            allowable_status_codes: vec![200, 203],
            stale_if_error: true,
            ..Default::default()
        };
        let settings = config.cache_settings();
        assert_eq!(settings.expire_after_seconds, 120);
        assert!(settings.allowable_methods.contains("GET"));
        assert!(settings.allowable_methods.contains("POST"));
        assert!(settings.is_cacheable_status(203));
        assert!(settings.stale_if_error);
        assert!(settings.url_filter.is_none());
    }

    #[test]
    fn test_extract_from_toml() {
        let figment = Figment::from(Serialized::defaults(AppConfig::default())).merge(Toml::string(
            r#"
            expire_after_seconds = 30
            allowable_status_codes = [200, 301]
            stale_if_error = true
            "#,
        ));
        let config = AppConfig::extract(figment).unwrap();
        assert_eq!(config.expire_after_seconds, 30);
        assert_eq!(config.allowable_status_codes, vec![200, 301]);
        assert!(config.stale_if_error);
        assert_eq!(config.user_agent, "reqcache/0.1");
    }

    #[test]
    fn test_extract_rejects_invalid() {
        let figment =
            Figment::from(Serialized::defaults(AppConfig::default())).merge(Toml::string("timeout_ms = 10"));
        let result = AppConfig::extract(figment);
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));
    }
}
