//! Marksboard API Server
//!
//! Run with: cargo run --bin marksboard-api
//!
//! # Configuration
//!
//! Reads the same config file as `marksboard` (`--config`, then the platform
//! config dir, then `./marksboard.toml`). Environment variables:
//! - `MARKSBOARD_HOST`: Host to bind to (default: 127.0.0.1)
//! - `MARKSBOARD_PORT`: Port to listen on (default: 3001)
//! - `MARKSBOARD_FIRESTORE_PROJECT`: Project for the `document` backing
//! - `MARKSBOARD_LOG_LEVEL`, `MARKSBOARD_LOG_FORMAT`
//! - `RUST_LOG`: Log filter, overrides the configured level

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;

use marksboard::api::{backing_store, serve, AppState};
use marksboard::config::Config;
use marksboard::store::StoreKind;

#[derive(Parser)]
#[command(name = "marksboard-api")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "REST backend for the marks dashboard")]
struct Args {
    /// Config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Store behind the server (memory, document)
    #[arg(long)]
    backing: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let (mut config, config_path) = Config::resolve(args.config.as_deref())?;
    if let Some(backing) = &args.backing {
        config.api.backing = backing.parse::<StoreKind>()?;
    }
    if let Some(port) = args.port {
        config.api.port = port;
    }
    config.validate()?;

    marksboard::logging::init(&config.logging)?;

    tracing::info!("Starting Marksboard API server v{}", env!("CARGO_PKG_VERSION"));
    if let Some(path) = &config_path {
        tracing::info!(path = ?path, "Loaded config");
    }

    let store = backing_store(config.api.backing, &config.store.document)
        .with_context(|| format!("failed to open the {} backing store", config.api.backing))?;

    if config.api.backing == StoreKind::Document {
        tracing::info!(
            project = %config.store.document.project_id,
            collection = %config.store.document.collection,
            "Proxying records to Firestore"
        );
    } else {
        tracing::warn!("Records are kept in memory and lost on shutdown");
    }

    let state = AppState::new(store, config.api.clone());
    serve(state, &config.api).await?;

    tracing::info!("Marksboard API server stopped");
    Ok(())
}
