//! In-process store
//!
//! Keeps records in creation order behind an async lock. Every create bumps a
//! version counter that live subscriptions wait on.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use uuid::Uuid;

use super::error::StoreResult;
use super::subscription::Subscription;
use super::{newest_first, Created, RecordStore, StoreKind};
use crate::record::{Record, Timestamp};

/// Record store held entirely in memory
pub struct MemoryStore {
    records: Arc<RwLock<Vec<Record>>>,
    version: watch::Sender<u64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (version, _) = watch::channel(0);
        Self {
            records: Arc::new(RwLock::new(Vec::new())),
            version,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Memory
    }

    async fn create_record(&self, name: &str, marks: f64) -> StoreResult<Created> {
        let record = Record {
            id: Uuid::new_v4().simple().to_string(),
            name: name.to_string(),
            marks,
            created_at: Timestamp::now(),
        };

        self.records.write().await.push(record.clone());
        self.version.send_modify(|v| *v += 1);

        tracing::debug!(record_id = %record.id, name = %record.name, marks, "Record stored");

        Ok(Created {
            record: Some(record),
            message: None,
        })
    }

    async fn list_records(&self) -> StoreResult<Vec<Record>> {
        Ok(self.records.read().await.clone())
    }

    fn supports_subscribe(&self) -> bool {
        true
    }

    async fn subscribe(&self) -> StoreResult<Subscription> {
        let records = Arc::clone(&self.records);
        let mut changes = self.version.subscribe();

        Ok(Subscription::spawn(move |sink| async move {
            loop {
                // Mark the current version seen before reading, so a create
                // that lands after the read still wakes us.
                changes.borrow_and_update();
                let snapshot = newest_first(records.read().await.clone());

                if !sink.push(snapshot).await {
                    return;
                }

                if changes.changed().await.is_err() {
                    // Store dropped
                    return;
                }
            }
        }))
    }
}
