//! Configuration management for the Wayfarer application
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::WayfarerError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure for the Wayfarer application
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WayfarerConfig {
    /// Assistant (generative-language API) configuration
    #[serde(default)]
    pub assistant: AssistantConfig,
    /// Geocoding API configuration
    #[serde(default)]
    pub geocoding: GeocodingConfig,
    /// Exchange-rate API configuration
    #[serde(default)]
    pub rates: RatesConfig,
    /// Trip store configuration
    #[serde(default)]
    pub store: StoreConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
}

/// Assistant API configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// Generative-language API key; the chat endpoint is disabled without it
    pub api_key: Option<String>,
    /// Base URL for the generative-language API
    #[serde(default = "default_assistant_base_url")]
    pub base_url: String,
    /// Model identifier
    #[serde(default = "default_assistant_model")]
    pub model: String,
    /// Request timeout in seconds
    #[serde(default = "default_assistant_timeout")]
    pub timeout_seconds: u32,
    /// Maximum tool-call rounds per conversation turn
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: u32,
}

/// Geocoding API configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodingConfig {
    /// Base URL for the geocoding API (keyless)
    #[serde(default = "default_geocoding_base_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_http_timeout")]
    pub timeout_seconds: u32,
    /// Maximum number of place results to return
    #[serde(default = "default_max_places")]
    pub max_results: u32,
}

/// Exchange-rate API configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatesConfig {
    /// Base URL for the exchange-rate API (keyless)
    #[serde(default = "default_rates_base_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_http_timeout")]
    pub timeout_seconds: u32,
    /// Rate cache TTL in minutes
    #[serde(default = "default_rates_ttl")]
    pub cache_ttl_minutes: u32,
}

/// Trip store configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Trip database directory location
    #[serde(default = "default_store_location")]
    pub location: String,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// HTTP server configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Port to listen on
    #[serde(default = "default_server_port")]
    pub port: u16,
    /// Directory with static frontend assets
    #[serde(default = "default_assets_dir")]
    pub assets_dir: String,
}

// Default value functions
fn default_assistant_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_assistant_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_assistant_timeout() -> u32 {
    60
}

fn default_max_tool_rounds() -> u32 {
    8
}

fn default_geocoding_base_url() -> String {
    "https://geocoding-api.open-meteo.com/v1".to_string()
}

fn default_http_timeout() -> u32 {
    30
}

fn default_max_places() -> u32 {
    5
}

fn default_rates_base_url() -> String {
    "https://api.frankfurter.dev/v1".to_string()
}

fn default_rates_ttl() -> u32 {
    60
}

fn default_store_location() -> String {
    dirs::data_dir()
        .map(|dir| dir.join("wayfarer").join("trips"))
        .map_or_else(
            || "wayfarer-trips".to_string(),
            |p| p.to_string_lossy().into_owned(),
        )
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_server_port() -> u16 {
    8080
}

fn default_assets_dir() -> String {
    "frontend/dist".to_string()
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_assistant_base_url(),
            model: default_assistant_model(),
            timeout_seconds: default_assistant_timeout(),
            max_tool_rounds: default_max_tool_rounds(),
        }
    }
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            base_url: default_geocoding_base_url(),
            timeout_seconds: default_http_timeout(),
            max_results: default_max_places(),
        }
    }
}

impl Default for RatesConfig {
    fn default() -> Self {
        Self {
            base_url: default_rates_base_url(),
            timeout_seconds: default_http_timeout(),
            cache_ttl_minutes: default_rates_ttl(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            location: default_store_location(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_server_port(),
            assets_dir: default_assets_dir(),
        }
    }
}

impl WayfarerConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        // Load from file if path is provided or use default location
        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // Add environment variable overrides with WAYFARER_ prefix
        builder = builder.add_source(
            Environment::with_prefix("WAYFARER")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let config: WayfarerConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("wayfarer").join("config.toml"))
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_api_keys()?;
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Validate API keys and credentials
    pub fn validate_api_keys(&self) -> Result<()> {
        // The assistant key is optional; the chat endpoint is simply disabled
        // when it is missing.
        if let Some(api_key) = &self.assistant.api_key {
            if api_key.is_empty() {
                return Err(WayfarerError::config(
                    "Assistant API key cannot be empty if provided. Either remove it or provide a valid key."
                ).into());
            }

            if api_key.len() < 8 {
                return Err(WayfarerError::config(
                    "Assistant API key appears to be invalid (too short). Please check your API key."
                ).into());
            }
        }

        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.assistant.timeout_seconds > 300 {
            return Err(
                WayfarerError::config("Assistant timeout cannot exceed 300 seconds").into(),
            );
        }

        if self.assistant.max_tool_rounds == 0 || self.assistant.max_tool_rounds > 32 {
            return Err(
                WayfarerError::config("Assistant max tool rounds must be between 1 and 32").into(),
            );
        }

        if self.geocoding.timeout_seconds > 300 || self.rates.timeout_seconds > 300 {
            return Err(WayfarerError::config("API timeout cannot exceed 300 seconds").into());
        }

        if self.geocoding.max_results == 0 || self.geocoding.max_results > 50 {
            return Err(
                WayfarerError::config("Geocoding max results must be between 1 and 50").into(),
            );
        }

        if self.rates.cache_ttl_minutes > 24 * 60 {
            return Err(
                WayfarerError::config("Rate cache TTL cannot exceed 1440 minutes (1 day)").into(),
            );
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(WayfarerError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(WayfarerError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        for (name, url) in [
            ("Assistant", &self.assistant.base_url),
            ("Geocoding", &self.geocoding.base_url),
            ("Rates", &self.rates.base_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(WayfarerError::config(format!(
                    "{name} base URL must be a valid HTTP or HTTPS URL"
                ))
                .into());
            }
        }

        Ok(())
    }
}
