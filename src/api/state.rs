//! Application State
//!
//! Shared state accessible by all API handlers.

use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;

use crate::store::{RecordStore, StoreKind};

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Where records are kept
    pub store: Arc<dyn RecordStore>,
    pub config: Arc<ApiConfig>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    pub fn new(store: Arc<dyn RecordStore>, config: ApiConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

/// API server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Store the server keeps records in (`memory` or `document`)
    #[serde(default = "default_backing")]
    pub backing: StoreKind,

    /// Longest accepted candidate name, in characters
    #[serde(default = "default_max_name_length")]
    pub max_name_length: usize,

    /// Maximum request body size in bytes
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3001
}

fn default_backing() -> StoreKind {
    StoreKind::Memory
}

fn default_max_name_length() -> usize {
    100
}

fn default_max_body_size() -> usize {
    64 * 1024
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            backing: default_backing(),
            max_name_length: default_max_name_length(),
            max_body_size: default_max_body_size(),
        }
    }
}

impl ApiConfig {
    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
