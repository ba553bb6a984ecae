use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::ConfigError;

/// Environment variable that overrides `weather.api_key`
pub const API_KEY_ENV: &str = "OPENWEATHER_API_KEY";

const APP_DIR_NAME: &str = "hoenn-map";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application configuration directory
    pub config_dir: PathBuf,

    /// Weather resolution settings
    #[serde(default)]
    pub weather: WeatherConfig,

    /// Daily condition cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Location catalog source
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// HTTP retry policy for the observation provider
    #[serde(default)]
    pub retry: RetrySettings,
}

/// Which wall clock decides where one calendar day ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DayBoundary {
    #[default]
    Utc,
    Local,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// OpenWeatherMap API key. Empty means no real-world data.
    #[serde(default)]
    pub api_key: String,

    /// Base URL of the OpenWeatherMap API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Never fetch observations; draw from each location's allowed set instead
    #[serde(default)]
    pub offline: bool,

    /// Write re-rolled conditions into today's cache entry
    #[serde(default)]
    pub persist_rerolls: bool,

    /// Day key derivation
    #[serde(default)]
    pub day_boundary: DayBoundary,
}

fn default_base_url() -> String {
    "https://api.openweathermap.org".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            offline: false,
            persist_rerolls: false,
            day_boundary: DayBoundary::Utc,
        }
    }
}

impl WeatherConfig {
    /// Check if an API key is configured (not a placeholder)
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty() && !self.api_key.starts_with("YOUR_")
    }

    /// True when observations should be fetched from the network
    pub fn uses_observations(&self) -> bool {
        !self.offline && self.has_api_key()
    }
}

/// Backing store for the daily condition cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    #[default]
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub backend: CacheBackend,

    /// SQLite file; relative paths resolve against `config_dir`
    #[serde(default = "default_cache_path")]
    pub path: PathBuf,
}

fn default_cache_path() -> PathBuf {
    PathBuf::from("weather_cache.db")
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Sqlite,
            path: default_cache_path(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Custom catalog file (TOML). The built-in Hoenn catalog is used when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_max_retries() -> u32 {
    2
}

fn default_initial_delay_ms() -> u64 {
    200
}

fn default_max_delay_ms() -> u64 {
    2000
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR_NAME);

        Self {
            config_dir,
            weather: WeatherConfig::default(),
            cache: CacheConfig::default(),
            catalog: CatalogConfig::default(),
            retry: RetrySettings::default(),
        }
    }
}

impl Config {
    /// Load configuration from file, creating default if it doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path, writing defaults there if missing
    pub fn load_from(config_path: &Path) -> Result<Self> {
        let mut config = if config_path.exists() {
            let contents =
                std::fs::read_to_string(config_path).context("Failed to read config file")?;
            toml::from_str::<Config>(&contents)
                .map_err(|e| ConfigError::ParseError(format!("{}: {}", config_path.display(), e)))?
        } else {
            let mut config = Self::default();
            if let Some(parent) = config_path.parent() {
                config.config_dir = parent.to_path_buf();
            }
            config.save_to(config_path)?;
            config
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Validate, logging warnings. Any error makes the whole config invalid.
    pub fn ensure_valid(&self) -> std::result::Result<ValidationResult, ConfigError> {
        let validation = self.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()));
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok(validation)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                tracing::debug!("Using weather API key from {}", API_KEY_ENV);
                self.weather.api_key = key;
            }
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.weather.base_url, "weather.base_url", &mut result);

        if self.weather.timeout_secs == 0 {
            result.add_error("weather.timeout_secs", "Timeout must be greater than 0");
        } else if self.weather.timeout_secs > 120 {
            result.add_warning(
                "weather.timeout_secs",
                "Timeout is unusually long (>120 seconds)",
            );
        }

        if !self.weather.offline && !self.weather.has_api_key() {
            result.add_warning(
                "weather.api_key",
                "No API key configured - conditions will be drawn at random",
            );
        }

        if self.cache.backend == CacheBackend::Sqlite
            && self.cache.path.as_os_str().is_empty()
        {
            result.add_error("cache.path", "SQLite cache path must not be empty");
        }

        if self.cache.backend == CacheBackend::Memory {
            result.add_warning(
                "cache.backend",
                "Memory cache does not survive restarts",
            );
        }

        if let Some(path) = &self.catalog.path {
            if !path.exists() {
                result.add_error(
                    "catalog.path",
                    format!("Path does not exist: {}", path.display()),
                );
            } else if !path.is_file() {
                result.add_error(
                    "catalog.path",
                    format!("Path is not a file: {}", path.display()),
                );
            }
        }

        if self.retry.initial_delay_ms > self.retry.max_delay_ms {
            result.add_error(
                "retry.initial_delay_ms",
                "Initial delay must not exceed max delay",
            );
        }

        result
    }

    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Resolved location of the SQLite cache file
    pub fn cache_file(&self) -> PathBuf {
        if self.cache.path.is_absolute() {
            self.cache.path.clone()
        } else {
            self.config_dir.join(&self.cache.path)
        }
    }

    /// Save configuration to an explicit path
    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(config_path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| ConfigError::NotFound("platform config directory".to_string()))?
            .join(APP_DIR_NAME);

        Ok(config_dir.join("config.toml"))
    }
}
