//! Store Adapters
//!
//! The boundary between the dashboard and whatever persists records.
//!
//! ## Implementations
//!
//! - [`RestStore`]: pull-based client for the `/students` REST API
//! - [`DocumentStore`]: Firestore REST client with a live listener
//! - [`MemoryStore`]: in-process store, backs the API server by default
//!
//! All three implement [`RecordStore`]. Which one the dashboard talks to is
//! decided once, at composition time, by [`build_store`].

mod document;
mod error;
mod memory;
mod rest;
mod subscription;

#[cfg(test)]
pub(crate) mod testing;

pub use document::{value, DocumentConfig, DocumentStore};
pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use rest::{ApiEnvelope, RestConfig, RestStore};
pub use subscription::Subscription;

use async_trait::async_trait;
use serde::Deserialize;
use std::str::FromStr;
use std::sync::Arc;

use crate::record::Record;

/// Which adapter is in use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Rest,
    Document,
    Memory,
}

impl std::fmt::Display for StoreKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreKind::Rest => write!(f, "rest"),
            StoreKind::Document => write!(f, "document"),
            StoreKind::Memory => write!(f, "memory"),
        }
    }
}

impl FromStr for StoreKind {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "rest" => Ok(StoreKind::Rest),
            "document" | "firestore" => Ok(StoreKind::Document),
            "memory" => Ok(StoreKind::Memory),
            other => Err(StoreError::Config(format!(
                "unknown store backend '{}' (expected rest, document or memory)",
                other
            ))),
        }
    }
}

/// Outcome of a successful create
#[derive(Debug, Clone, Default)]
pub struct Created {
    /// The stored record, when the backend echoes it back
    pub record: Option<Record>,
    /// Backend-provided confirmation text
    pub message: Option<String>,
}

/// Common interface for every backing store
#[async_trait]
pub trait RecordStore: Send + Sync {
    fn kind(&self) -> StoreKind;

    /// Persist a new record
    async fn create_record(&self, name: &str, marks: f64) -> StoreResult<Created>;

    /// Read the full collection once
    async fn list_records(&self) -> StoreResult<Vec<Record>>;

    /// Highest marks first; ties keep the earlier record first
    async fn top_performers(&self, limit: usize) -> StoreResult<Vec<Record>> {
        let records = self.list_records().await?;
        Ok(rank_by_marks(records, limit))
    }

    /// Whether `subscribe` is backed by a live listener
    fn supports_subscribe(&self) -> bool {
        false
    }

    /// Open a live, newest-first view of the collection
    async fn subscribe(&self) -> StoreResult<Subscription> {
        Err(StoreError::Unsupported {
            store: self.kind(),
            operation: "subscribe",
        })
    }
}

/// Sort by marks descending, then creation ascending, and keep `limit`
pub fn rank_by_marks(mut records: Vec<Record>, limit: usize) -> Vec<Record> {
    records.sort_by(|a, b| {
        b.marks
            .total_cmp(&a.marks)
            .then_with(|| a.created_at.cmp(&b.created_at))
    });
    records.truncate(limit);
    records
}

/// Newest first, the order every subscription delivers
pub(crate) fn newest_first(mut records: Vec<Record>) -> Vec<Record> {
    records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    records
}

/// Build the adapter selected by `kind`
pub fn build_store(
    kind: StoreKind,
    rest: &RestConfig,
    document: &DocumentConfig,
) -> StoreResult<Arc<dyn RecordStore>> {
    let store: Arc<dyn RecordStore> = match kind {
        StoreKind::Rest => Arc::new(RestStore::new(rest.clone())?),
        StoreKind::Document => Arc::new(DocumentStore::new(document.clone())?),
        StoreKind::Memory => Arc::new(MemoryStore::new()),
    };

    tracing::debug!(backend = %kind, "Store adapter ready");
    Ok(store)
}
