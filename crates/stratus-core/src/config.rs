use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use stratus_weather::provider::{DEFAULT_API_BASE_URL, DEFAULT_GEO_BASE_URL};
use stratus_weather::{ProviderConfig, TemperatureUnit, DEFAULT_DAILY_DAYS, DEFAULT_HOURLY_WINDOW};
use url::Url;

use crate::error::ConfigError;

/// Environment variable consulted when no API key is configured
pub const API_KEY_ENV: &str = "OPENWEATHER_API_KEY";

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

    /// Upstream provider and display settings
    #[serde(default)]
    pub weather: WeatherConfig,

    /// Cache tier settings
    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Base URL for current weather and forecast requests
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Base URL for city search (geocoding) requests
    #[serde(default = "default_geo_base_url")]
    pub geo_base_url: String,

    /// Provider API key. Falls back to `OPENWEATHER_API_KEY` when empty.
    #[serde(default)]
    pub api_key: String,

    /// Display unit; data is always fetched and cached in Celsius
    #[serde(default)]
    pub temperature_unit: TemperatureUnit,

    /// Per-request HTTP timeout
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Number of forecast samples in the hourly view
    #[serde(default = "default_hourly_window")]
    pub hourly_window: usize,

    /// Maximum number of days in the daily view
    #[serde(default = "default_daily_days")]
    pub daily_days: usize,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_geo_base_url() -> String {
    DEFAULT_GEO_BASE_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_hourly_window() -> usize {
    DEFAULT_HOURLY_WINDOW
}

fn default_daily_days() -> usize {
    DEFAULT_DAILY_DAYS
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            geo_base_url: default_geo_base_url(),
            api_key: String::new(),
            temperature_unit: TemperatureUnit::default(),
            request_timeout_secs: default_request_timeout_secs(),
            hourly_window: default_hourly_window(),
            daily_days: default_daily_days(),
        }
    }
}

impl WeatherConfig {
    /// The configured key, or the environment fallback.
    pub fn effective_api_key(&self) -> Option<String> {
        if !self.api_key.is_empty() {
            return Some(self.api_key.clone());
        }
        std::env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty())
    }

    pub fn provider_config(&self) -> ProviderConfig {
        ProviderConfig {
            api_base_url: self.api_base_url.clone(),
            geo_base_url: self.geo_base_url.clone(),
            api_key: self.effective_api_key().unwrap_or_default(),
            timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Freshness window for cached responses
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: u64,

    /// Persist the durable tier to `<config_dir>/weather_cache.db`.
    /// When false an in-process tier stands in for it.
    #[serde(default = "default_durable")]
    pub durable: bool,
}

fn default_ttl_seconds() -> u64 {
    60
}

fn default_durable() -> bool {
    true
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_ttl_seconds(),
            durable: default_durable(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

impl Default for Config {
    fn default() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("stratus");

        Self {
            config_dir,
            weather: WeatherConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file, creating default if it doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path, writing defaults there if
    /// the file is missing.
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            let mut config = Self::default();
            if let Some(parent) = config_path.parent() {
                config.config_dir = parent.to_path_buf();
            }
            config.save_to(config_path)?;
            return Ok(config);
        }

        let contents =
            std::fs::read_to_string(config_path).context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()))
            .context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.weather.api_base_url, "weather.api_base_url", &mut result);
        self.validate_url(&self.weather.geo_base_url, "weather.geo_base_url", &mut result);

        if self.weather.effective_api_key().is_none() {
            result.add_warning(
                "weather.api_key",
                format!("No API key configured (set it here or via {})", API_KEY_ENV),
            );
        }

        if self.weather.request_timeout_secs == 0 {
            result.add_error("weather.request_timeout_secs", "Timeout must be greater than 0");
        }

        if self.weather.hourly_window == 0 {
            result.add_error("weather.hourly_window", "Hourly window must be greater than 0");
        }

        if self.weather.daily_days == 0 {
            result.add_error("weather.daily_days", "Daily view must show at least 1 day");
        } else if self.weather.daily_days > DEFAULT_DAILY_DAYS {
            result.add_warning(
                "weather.daily_days",
                "The provider forecast covers about 5 days; extra days will be empty",
            );
        }

        if self.cache.ttl_seconds == 0 {
            result.add_error("cache.ttl_seconds", "Cache TTL must be greater than 0");
        } else if self.cache.ttl_seconds > 3600 {
            result.add_warning("cache.ttl_seconds", "Cache TTL is more than an hour");
        }

        result
    }

    /// Validate a URL field
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

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(config_path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Path of the durable cache database
    pub fn cache_db_path(&self) -> PathBuf {
        self.config_dir.join("weather_cache.db")
    }

    /// Get the path to the configuration file
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?.join("stratus");

        Ok(config_dir.join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    fn keyed() -> Config {
        let mut config = Config::default();
        config.weather.api_key = "abc123".to_string();
        config
    }

    #[test]
    fn test_valid_default_config() {
        let result = keyed().validate();
        assert!(result.is_valid(), "Default config should be valid: {:?}", result.errors);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_invalid_url() {
        let mut config = keyed();
        config.weather.api_base_url = "not-a-url".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "weather.api_base_url"));
    }

    #[test]
    fn test_invalid_url_scheme() {
        let mut config = keyed();
        config.weather.geo_base_url = "ftp://api.example.com/geo".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.message.contains("http or https")));
    }

    #[test]
    fn test_zero_ttl_is_error() {
        let mut config = keyed();
        config.cache.ttl_seconds = 0;
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "cache.ttl_seconds"));
    }

    #[test]
    fn test_zero_windows_are_errors() {
        let mut config = keyed();
        config.weather.hourly_window = 0;
        config.weather.daily_days = 0;
        let result = config.validate();
        assert_eq!(result.errors.len(), 2);
    }

    #[test]
    fn test_long_daily_view_is_warning() {
        let mut config = keyed();
        config.weather.daily_days = 10;
        let result = config.validate();
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.field == "weather.daily_days"));
    }

    #[test]
    fn test_validation_result_error_summary() {
        let mut result = ValidationResult::default();
        result.add_error("field1", "error1");
        result.add_error("field2", "error2");
        let summary = result.error_summary();
        assert!(summary.contains("field1"));
        assert!(summary.contains("field2"));
    }

    #[test]
    fn test_load_from_creates_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stratus").join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.config_dir, dir.path().join("stratus"));
        assert_eq!(config.cache.ttl_seconds, 60);
        assert_eq!(config.weather.daily_days, 7);
    }

    #[test]
    fn test_load_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
            config_dir = "/tmp/stratus"

            [weather]
            api_key = "k"
            temperature_unit = "fahrenheit"
            "#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.weather.temperature_unit, TemperatureUnit::Fahrenheit);
        assert_eq!(config.weather.hourly_window, 24);
        assert_eq!(config.weather.api_base_url, DEFAULT_API_BASE_URL);
        assert!(config.cache.durable);
        assert_eq!(config.cache.ttl(), Duration::from_secs(60));
    }

    #[test]
    fn test_malformed_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "config_dir = [").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_provider_config_uses_settings() {
        let mut config = keyed();
        config.weather.request_timeout_secs = 3;
        let provider = config.weather.provider_config();
        assert_eq!(provider.api_key, "abc123");
        assert_eq!(provider.timeout, Duration::from_secs(3));
    }
}
