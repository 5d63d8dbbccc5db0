//! # Marksboard
//!
//! Candidate marks dashboard: submit a name and a score, store it through a
//! REST backend or a Firestore document store, and watch a bar chart of every
//! record stay current.
//!
//! ## Features
//!
//! - **Interchangeable stores**: REST client, Firestore REST client, or in-memory
//! - **Two refresh strategies**: interval polling or a live subscription
//! - **Consistent refresh**: a successful submit refreshes the chart at once,
//!   and a slow fetch never overwrites a newer one
//! - **Bundled backend**: the Axum REST server the REST store talks to
//!
//! ## Modules
//!
//! - [`record`]: record model and form validation
//! - [`store`]: the [`RecordStore`] trait and its adapters
//! - [`dashboard`]: submission form, chart view and page composition
//! - [`api`]: REST API server with Axum
//! - [`config`]: TOML configuration with environment overrides
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use marksboard::dashboard::{render, Dashboard};
//! use marksboard::store::{MemoryStore, RecordStore};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
//!     let dashboard = Dashboard::new(store, Duration::from_secs(5));
//!     dashboard.mount();
//!
//!     let message = dashboard.submit_input("Ava", "87").await?;
//!     println!("{}", message);
//!
//!     let chart = dashboard.chart();
//!     println!("{}", render::render_chart(&chart.state(), chart.strategy(), 40));
//!
//!     dashboard.unmount();
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod dashboard;
pub mod logging;
pub mod record;
pub mod store;

// Re-export top-level types for convenience
pub use record::{ChartPoint, MarksPolicy, Record, Timestamp, ValidationError};

pub use store::{
    build_store, DocumentConfig, DocumentStore, MemoryStore, RecordStore, RestConfig, RestStore,
    StoreError, StoreKind, StoreResult, Subscription,
};

pub use dashboard::{ChartState, ChartView, Dashboard, RefreshStrategy, SubmissionForm, SubmitError};

pub use api::{build_router, serve, ApiConfig, ApiError, AppState};

pub use config::{Config, ConfigError, LoggingConfig};
