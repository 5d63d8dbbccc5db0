//! Tracing setup shared by both binaries
//!
//! `RUST_LOG` wins over the configured level when set.

use std::fs::OpenOptions;
use std::sync::Arc;
use thiserror::Error;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, LoggingConfig};

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Invalid log filter '{directive}': {error}")]
    Filter { directive: String, error: String },

    #[error("Failed to open log file {path:?}: {error}")]
    File {
        path: std::path::PathBuf,
        error: std::io::Error,
    },

    #[error("Failed to install subscriber: {0}")]
    Init(String),
}

/// Filter directive for a configured level
///
/// A bare level (`debug`) applies to this crate and the HTTP trace layer;
/// anything with `=` or `,` is used as written.
pub fn filter_directive(level: &str) -> String {
    let level = level.trim();
    if level.contains('=') || level.contains(',') {
        level.to_string()
    } else {
        format!("marksboard={level},tower_http={level}")
    }
}

/// Install the global subscriber
pub fn init(config: &LoggingConfig) -> Result<(), LoggingError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => {
            let directive = filter_directive(&config.level);
            EnvFilter::try_new(&directive).map_err(|e| LoggingError::Filter {
                directive,
                error: e.to_string(),
            })?
        }
    };

    let (writer, ansi) = match &config.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|error| LoggingError::File {
                    path: path.clone(),
                    error,
                })?;
            (BoxMakeWriter::new(Arc::new(file)), false)
        }
        None => (BoxMakeWriter::new(std::io::stderr), true),
    };

    let registry = tracing_subscriber::registry().with(filter);

    let result = match config.format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(writer))
            .try_init(),
        LogFormat::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(ansi),
            )
            .try_init(),
    };

    result.map_err(|e| LoggingError::Init(e.to_string()))
}
