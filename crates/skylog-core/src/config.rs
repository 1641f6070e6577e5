use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use skylog_weather::{Endpoint, Location, TemperatureUnit, DEFAULT_API_BASE};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::error::ConfigError;

/// Environment variable holding the WeatherAPI key.
pub const API_KEY_ENV: &str = "WEATHER_API_KEY";
/// Environment variable overriding the WeatherAPI base URL (proxy only).
pub const API_URL_ENV: &str = "WEATHER_API_URL";
/// Environment variable with the proxy's listen address.
pub const PROXY_ADDR_ENV: &str = "SKYLOG_PROXY_ADDR";

const DEFAULT_PROXY_URL: &str = "http://localhost:3000/api/weather";
const DEFAULT_PROXY_ADDR: &str = "127.0.0.1:3000";

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

    /// Add an error
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Add a warning
    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }
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

    /// Weather provider settings
    #[serde(default)]
    pub weather: WeatherConfig,

    /// Search history storage
    #[serde(default)]
    pub history: HistoryConfig,

    /// Fallback position for autolocation searches
    #[serde(default)]
    pub location: LocationConfig,

    /// Display preferences
    #[serde(default)]
    pub ui: UiConfig,
}

/// How weather requests reach WeatherAPI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EndpointMode {
    /// Through the skylog proxy, which holds the API key.
    #[default]
    Proxy,
    /// Straight to WeatherAPI with a local API key.
    Direct,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    pub mode: EndpointMode,

    /// Proxy endpoint, e.g. `http://localhost:3000/api/weather`
    pub proxy_url: String,

    /// WeatherAPI base URL for direct mode
    pub api_base_url: String,

    /// WeatherAPI key for direct mode. Falls back to `WEATHER_API_KEY`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            mode: EndpointMode::Proxy,
            proxy_url: DEFAULT_PROXY_URL.to_string(),
            api_base_url: DEFAULT_API_BASE.to_string(),
            api_key: None,
            timeout_secs: 10,
        }
    }
}

impl WeatherConfig {
    /// API key from the config file, else from the environment.
    pub fn effective_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|k| !k.trim().is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Build the provider endpoint for the configured mode.
    ///
    /// # Errors
    /// Returns `ConfigError::MissingSetting` in direct mode without an API key.
    pub fn endpoint(&self) -> Result<Endpoint, ConfigError> {
        match self.mode {
            EndpointMode::Proxy => Ok(Endpoint::Proxy {
                url: self.proxy_url.clone(),
            }),
            EndpointMode::Direct => {
                let api_key = self
                    .effective_api_key()
                    .ok_or_else(|| ConfigError::MissingSetting("weather.api_key".into()))?;
                Ok(Endpoint::Direct {
                    base_url: self.api_base_url.clone(),
                    api_key,
                })
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// SQLite file (relative to the config directory) holding the history log
    pub database_file: String,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            database_file: "history.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocationConfig {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub name: Option<String>,
}

impl LocationConfig {
    /// Configured position, if both coordinates are set.
    pub fn location(&self) -> Option<Location> {
        Some(Location {
            latitude: self.latitude?,
            longitude: self.longitude?,
            accuracy_meters: None,
            city_name: self.name.clone(),
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UiConfig {
    /// Temperature unit preference
    #[serde(default)]
    pub temperature_unit: TemperatureUnit,
}

impl Default for Config {
    fn default() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("skylog");

        Self {
            config_dir,
            weather: WeatherConfig::default(),
            history: HistoryConfig::default(),
            location: LocationConfig::default(),
            ui: UiConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file, creating default if it doesn't exist
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from a specific file, creating it with defaults if missing
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            let config = Self::default();
            config.save_to(config_path)?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(config_path)
            .context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents)
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
            anyhow::bail!(
                "Configuration validation failed: {}",
                validation.error_summary()
            );
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Validate the configuration
    ///
    /// Returns a ValidationResult containing any errors or warnings.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        match self.weather.mode {
            EndpointMode::Proxy => {
                validate_url(&self.weather.proxy_url, "weather.proxy_url", &mut result);
            }
            EndpointMode::Direct => {
                validate_url(&self.weather.api_base_url, "weather.api_base_url", &mut result);
                if self.weather.effective_api_key().is_none() {
                    result.add_error(
                        "weather.api_key",
                        format!("Direct mode needs an API key (set it here or in {})", API_KEY_ENV),
                    );
                }
            }
        }

        if self.weather.timeout_secs == 0 {
            result.add_error("weather.timeout_secs", "Timeout must be greater than 0");
        } else if self.weather.timeout_secs > 120 {
            result.add_warning("weather.timeout_secs", "Timeout is unusually long (>120s)");
        }

        if self.history.database_file.trim().is_empty() {
            result.add_error("history.database_file", "Database file name is empty");
        }

        match (self.location.latitude, self.location.longitude) {
            (Some(lat), Some(lon)) => {
                if !(-90.0..=90.0).contains(&lat) {
                    result.add_error("location.latitude", "Latitude must be between -90 and 90");
                }
                if !(-180.0..=180.0).contains(&lon) {
                    result.add_error(
                        "location.longitude",
                        "Longitude must be between -180 and 180",
                    );
                }
            }
            (None, None) => {}
            _ => result.add_warning(
                "location",
                "Only one coordinate set - autolocation is disabled",
            ),
        }

        result
    }

    /// Path of the SQLite history database
    pub fn history_db_path(&self) -> PathBuf {
        self.config_dir.join(&self.history.database_file)
    }

    /// Write configuration to `config_path`, creating the directory if needed
    fn save_to(&self, config_path: &Path) -> Result<()> {
        // Ensure config directory exists
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        std::fs::write(config_path, contents)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("skylog");

        Ok(config_dir.join("config.toml"))
    }
}

/// Validate a URL field
fn validate_url(url_str: &str, field_name: &str, result: &mut ValidationResult) {
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

            if url.port() == Some(0) {
                result.add_error(field_name, "Port cannot be 0");
            }
        }
        Err(e) => {
            result.add_error(field_name, format!("Invalid URL: {}", e));
        }
    }
}

/// Settings for the weather proxy service, read from the environment.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub bind_addr: SocketAddr,
    /// WeatherAPI base URL
    pub upstream_url: String,
    /// Absent key is not fatal at startup; requests then fail with 500.
    pub api_key: Option<String>,
}

impl ProxyConfig {
    /// Read proxy settings from process environment variables.
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` for an unparsable listen address or upstream URL.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read proxy settings through `lookup`.
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` for an unparsable listen address or upstream URL.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_addr = lookup(PROXY_ADDR_ENV)
            .unwrap_or_else(|| DEFAULT_PROXY_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid(format!("{}: {}", PROXY_ADDR_ENV, e)))?;

        let upstream_url = lookup(API_URL_ENV).unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        Url::parse(&upstream_url)
            .map_err(|e| ConfigError::Invalid(format!("{}: {}", API_URL_ENV, e)))?;

        let api_key = lookup(API_KEY_ENV).filter(|k| !k.trim().is_empty());

        Ok(Self {
            bind_addr,
            upstream_url,
            api_key,
        })
    }
}
