//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::api::ApiConfig;
use crate::store::{self, DocumentConfig, RecordStore, RestConfig, StoreKind, StoreResult};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub dashboard: DashboardConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which backend the dashboard talks to, and how to reach each one
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_backend")]
    pub backend: StoreKind,

    #[serde(default)]
    pub rest: RestConfig,

    #[serde(default)]
    pub document: DocumentConfig,
}

fn default_backend() -> StoreKind {
    StoreKind::Rest
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            rest: RestConfig::default(),
            document: DocumentConfig::default(),
        }
    }
}

/// Dashboard behaviour
#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Rows shown by `marksboard top` when no limit is given
    #[serde(default = "default_top_limit")]
    pub top_limit: usize,

    /// Width of the longest bar, in characters
    #[serde(default = "default_chart_width")]
    pub chart_width: usize,
}

fn default_poll_interval() -> u64 {
    5000 // 5 seconds
}

fn default_top_limit() -> usize {
    5
}

fn default_chart_width() -> usize {
    40
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            top_limit: default_top_limit(),
            chart_width: default_chart_width(),
        }
    }
}

impl DashboardConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(ConfigError::Invalid(format!(
                "unknown log format '{}' (expected pretty or json)",
                other
            ))),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: LogFormat,

    pub file: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
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

        Ok(config)
    }

    /// Resolve the config file, apply environment overrides, and validate
    ///
    /// An explicit path must exist. Otherwise the first existing default
    /// location is used, and with none the built-in defaults apply.
    pub fn resolve(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>), ConfigError> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => default_paths().into_iter().find(|p| p.exists()),
        };

        let mut config = match &path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };

        config.apply_env_overrides()?;
        config.validate()?;

        Ok((config, path))
    }

    /// Apply environment variable overrides to an existing config
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `MARKSBOARD_*` overrides read through `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Store overrides
        if let Some(backend) = lookup("MARKSBOARD_BACKEND") {
            self.store.backend = backend
                .parse()
                .map_err(|_| invalid_override("MARKSBOARD_BACKEND", &backend))?;
        }
        if let Some(url) = lookup("MARKSBOARD_API_URL") {
            self.store.rest.base_url = url;
        }
        if let Some(project) = lookup("MARKSBOARD_FIRESTORE_PROJECT") {
            self.store.document.project_id = project;
        }
        if let Some(key) = lookup("MARKSBOARD_FIRESTORE_API_KEY") {
            self.store.document.api_key = Some(key);
        }

        // API overrides
        if let Some(host) = lookup("MARKSBOARD_HOST") {
            self.api.host = host;
        }
        if let Some(port) = lookup("MARKSBOARD_PORT") {
            self.api.port = port
                .parse()
                .map_err(|_| invalid_override("MARKSBOARD_PORT", &port))?;
        }

        // Dashboard overrides
        if let Some(interval) = lookup("MARKSBOARD_POLL_INTERVAL_MS") {
            self.dashboard.poll_interval_ms = interval
                .parse()
                .map_err(|_| invalid_override("MARKSBOARD_POLL_INTERVAL_MS", &interval))?;
        }

        // Logging overrides
        if let Some(level) = lookup("MARKSBOARD_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("MARKSBOARD_LOG_FORMAT") {
            self.logging.format = format.parse()?;
        }

        Ok(())
    }

    /// Check values serde cannot
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dashboard.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "dashboard.poll_interval_ms must be positive".to_string(),
            ));
        }
        if self.dashboard.chart_width == 0 {
            return Err(ConfigError::Invalid(
                "dashboard.chart_width must be positive".to_string(),
            ));
        }
        if !(1..=100).contains(&self.dashboard.top_limit) {
            return Err(ConfigError::Invalid(
                "dashboard.top_limit must be between 1 and 100".to_string(),
            ));
        }
        if self.api.backing == StoreKind::Rest {
            return Err(ConfigError::Invalid(
                "api.backing must be memory or document".to_string(),
            ));
        }
        if self.api.max_name_length == 0 {
            return Err(ConfigError::Invalid(
                "api.max_name_length must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Build the store adapter the dashboard uses
    pub fn build_store(&self) -> StoreResult<Arc<dyn RecordStore>> {
        store::build_store(self.store.backend, &self.store.rest, &self.store.document)
    }
}

/// Default config locations, in lookup order
pub fn default_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("marksboard").join("config.toml"));
    }
    paths.push(PathBuf::from("./marksboard.toml"));
    paths
}

fn invalid_override(key: &str, value: &str) -> ConfigError {
    ConfigError::Invalid(format!("{}: invalid value '{}'", key, value))
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
    r#"# Marksboard Configuration
#
# Environment variables override these settings:
# - MARKSBOARD_BACKEND
# - MARKSBOARD_API_URL
# - MARKSBOARD_FIRESTORE_PROJECT
# - MARKSBOARD_FIRESTORE_API_KEY
# - MARKSBOARD_HOST
# - MARKSBOARD_PORT
# - MARKSBOARD_POLL_INTERVAL_MS
# - MARKSBOARD_LOG_LEVEL
# - MARKSBOARD_LOG_FORMAT

[store]
# Backend the dashboard uses: rest, document or memory
backend = "rest"

[store.rest]
# Base URL of the REST API, including the /api prefix
base_url = "http://localhost:3001/api"

# Per-request timeout (ms)
request_timeout_ms = 10000

[store.document]
# Firestore REST endpoint
endpoint = "https://firestore.googleapis.com/v1"

# Google Cloud project id (required for the document backend)
project_id = ""

# Web API key
# api_key = ""

database = "(default)"
collection = "students"

# How often a live listener re-reads the collection (ms)
listen_interval_ms = 1000

# Per-request timeout (ms)
request_timeout_ms = 10000

[api]
# API server host
host = "127.0.0.1"

# API server port
port = 3001

# Store behind the server: memory or document
backing = "memory"

# Longest accepted candidate name (characters)
max_name_length = 100

# Maximum request body size (bytes)
max_body_size = 65536

[dashboard]
# Chart refresh period when polling (ms)
poll_interval_ms = 5000

# Default row count for `marksboard top`
top_limit = 5

# Width of the longest bar (characters)
chart_width = 40

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"

# Optional log file path
# file = "/var/log/marksboard/marksboard.log"
"#
    .to_string()
}
