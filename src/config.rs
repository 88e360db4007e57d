//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::assistant::AssistantConfig;
use crate::telemetry::{default_sites, GeneratorConfig, LocationSite, DEFAULT_HISTORY_CAPACITY};
use crate::websocket::RegistryConfig;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub feed: FeedConfig,

    #[serde(default)]
    pub hub: HubConfig,

    #[serde(default)]
    pub assistant: AssistantSection,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP/WebSocket server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8090
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Reading feed configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// Seconds between point readings
    #[serde(default = "default_reading_interval")]
    pub reading_interval_secs: u64,

    /// Seconds between full location-set snapshots
    #[serde(default = "default_location_interval")]
    pub location_interval_secs: u64,

    /// Readings retained per history stream
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// Monitored sites; defaults to the Nairobi set
    #[serde(default = "default_sites")]
    pub sites: Vec<LocationSite>,
}

fn default_reading_interval() -> u64 {
    5
}

fn default_location_interval() -> u64 {
    10
}

fn default_history_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            reading_interval_secs: default_reading_interval(),
            location_interval_secs: default_location_interval(),
            history_capacity: default_history_capacity(),
            sites: default_sites(),
        }
    }
}

impl FeedConfig {
    pub fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            reading_interval: Duration::from_secs(self.reading_interval_secs),
            location_interval: Duration::from_secs(self.location_interval_secs),
            sites: self.sites.clone(),
        }
    }
}

/// Connection hub configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HubConfig {
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Connections idle longer than this are unregistered
    #[serde(default = "default_liveness_window")]
    pub liveness_window_secs: u64,

    /// How often the idle sweep runs
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

fn default_max_connections() -> usize {
    1000
}

fn default_liveness_window() -> u64 {
    120
}

fn default_sweep_interval() -> u64 {
    30
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            liveness_window_secs: default_liveness_window(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

impl HubConfig {
    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            max_connections: self.max_connections,
            liveness_window: Duration::from_secs(self.liveness_window_secs),
            sweep_interval: Duration::from_secs(self.sweep_interval_secs),
        }
    }
}

/// Assistant collaborator configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssistantSection {
    /// Base URL of the assistant API; unset disables the upstream call
    pub url: Option<String>,

    #[serde(default = "default_assistant_timeout")]
    pub request_timeout_ms: u64,
}

fn default_assistant_timeout() -> u64 {
    10_000
}

impl AssistantSection {
    pub fn client_config(&self) -> AssistantConfig {
        AssistantConfig {
            base_url: self.url.clone(),
            request_timeout_ms: self.request_timeout_ms,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Check invariants the per-field serde defaults cannot enforce
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.feed.sites.is_empty() {
            return Err(ConfigError::Invalid(
                "feed.sites must list at least one site".to_string(),
            ));
        }
        Ok(())
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("airpulse").join("config.toml")),
            Some(PathBuf::from("/etc/airpulse/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("AIRPULSE_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("AIRPULSE_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }

        if let Ok(url) = std::env::var("AIRPULSE_ASSISTANT_URL") {
            self.assistant.url = Some(url);
        }

        if let Ok(level) = std::env::var("AIRPULSE_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("AIRPULSE_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            feed: FeedConfig::default(),
            hub: HubConfig::default(),
            assistant: AssistantSection::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Airpulse Configuration
#
# Environment variables override these settings:
# - AIRPULSE_HOST
# - AIRPULSE_PORT
# - AIRPULSE_ASSISTANT_URL
# - AIRPULSE_LOG_LEVEL
# - AIRPULSE_LOG_FORMAT

[server]
# Server host
host = "0.0.0.0"

# Server port
port = 8090

[feed]
# Seconds between point readings
reading_interval_secs = 5

# Seconds between full location-set snapshots
location_interval_secs = 10

# Readings retained per history stream
history_capacity = 100

# Monitored sites (defaults to the Nairobi set when omitted)
# [[feed.sites]]
# id = "nairobi-cbd"
# name = "Nairobi CBD"
# coordinates = [-1.2921, 36.8219]

[hub]
# Maximum concurrent WebSocket connections
max_connections = 1000

# Connections idle longer than this (seconds) are unregistered
liveness_window_secs = 120

# How often the idle sweep runs (seconds)
sweep_interval_secs = 30

[assistant]
# Base URL of the assistant API; leave unset to use canned replies
# url = "http://localhost:8080"

# Request timeout in milliseconds
request_timeout_ms = 10000

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
