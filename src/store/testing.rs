//! Test double that records calls and can be told to fail

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::error::{StoreError, StoreResult};
use super::memory::MemoryStore;
use super::subscription::Subscription;
use super::{Created, RecordStore, StoreKind};
use crate::record::Record;

/// Wraps a `MemoryStore`, counting calls and optionally failing them
pub(crate) struct RecordingStore {
    inner: MemoryStore,
    kind: StoreKind,
    live: bool,
    pub creates: Mutex<Vec<(String, f64)>>,
    pub lists: AtomicUsize,
    fail_creates: AtomicBool,
    fail_lists: AtomicBool,
    fail_subscribes: AtomicBool,
    subscribes: AtomicUsize,
    list_delay: Mutex<Option<Duration>>,
}

impl RecordingStore {
    /// Pull-only store reporting itself as REST
    pub fn pull() -> Self {
        Self::build(StoreKind::Rest, false)
    }

    /// Store with a live subscription, reporting itself as a document store
    pub fn live() -> Self {
        Self::build(StoreKind::Document, true)
    }

    fn build(kind: StoreKind, live: bool) -> Self {
        Self {
            inner: MemoryStore::new(),
            kind,
            live,
            creates: Mutex::new(Vec::new()),
            lists: AtomicUsize::new(0),
            fail_creates: AtomicBool::new(false),
            fail_lists: AtomicBool::new(false),
            fail_subscribes: AtomicBool::new(false),
            subscribes: AtomicUsize::new(0),
            list_delay: Mutex::new(None),
        }
    }

    pub fn fail_creates(&self, fail: bool) {
        self.fail_creates.store(fail, Ordering::SeqCst);
    }

    pub fn fail_lists(&self, fail: bool) {
        self.fail_lists.store(fail, Ordering::SeqCst);
    }

    pub fn fail_subscribes(&self, fail: bool) {
        self.fail_subscribes.store(fail, Ordering::SeqCst);
    }

    /// Hold list responses back after reading, to keep a fetch in flight
    pub fn delay_lists(&self, delay: Option<Duration>) {
        *self.list_delay.lock().unwrap() = delay;
    }

    pub fn create_count(&self) -> usize {
        self.creates.lock().unwrap().len()
    }

    pub fn list_count(&self) -> usize {
        self.lists.load(Ordering::SeqCst)
    }

    pub fn subscribe_count(&self) -> usize {
        self.subscribes.load(Ordering::SeqCst)
    }

    /// Insert a record without counting it as a create call
    pub async fn seed(&self, name: &str, marks: f64) -> Record {
        self.inner
            .create_record(name, marks)
            .await
            .unwrap()
            .record
            .unwrap()
    }
}

#[async_trait]
impl RecordStore for RecordingStore {
    fn kind(&self) -> StoreKind {
        self.kind
    }

    async fn create_record(&self, name: &str, marks: f64) -> StoreResult<Created> {
        self.creates.lock().unwrap().push((name.to_string(), marks));

        if self.fail_creates.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection refused".to_string()));
        }

        self.inner.create_record(name, marks).await
    }

    async fn list_records(&self) -> StoreResult<Vec<Record>> {
        self.lists.fetch_add(1, Ordering::SeqCst);

        if self.fail_lists.load(Ordering::SeqCst) {
            return Err(StoreError::Timeout);
        }

        // Read first, so a delayed response carries an old snapshot
        let snapshot = self.inner.list_records().await;

        let delay = *self.list_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        snapshot
    }

    fn supports_subscribe(&self) -> bool {
        self.live
    }

    async fn subscribe(&self) -> StoreResult<Subscription> {
        if !self.live {
            return Err(StoreError::Unsupported {
                store: self.kind,
                operation: "subscribe",
            });
        }

        self.subscribes.fetch_add(1, Ordering::SeqCst);
        if self.fail_subscribes.load(Ordering::SeqCst) {
            return Err(StoreError::Subscription("listener refused".to_string()));
        }
        self.inner.subscribe().await
    }
}
