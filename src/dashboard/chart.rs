//! Chart view
//!
//! Keeps the record list the bar chart draws, refreshed either by polling
//! `list_records` on an interval or by following a live subscription.
//!
//! Every poll or manual fetch takes a sequence number; a response is applied
//! only if no newer fetch has been applied already.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::record::{ChartPoint, Record, Timestamp};
use crate::store::{RecordStore, StoreResult};

/// Shown in place of the chart when a fetch or subscription fails
pub const LOAD_FAILED_MESSAGE: &str = "Failed to load student data";

/// Default polling period
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// How the view keeps its records current
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshStrategy {
    /// Re-read the whole collection every `interval`
    Polling { interval: Duration },
    /// Follow the store's live subscription
    Subscription,
}

impl RefreshStrategy {
    /// Subscription when the store offers one, polling otherwise
    pub fn for_store(store: &dyn RecordStore, poll_interval: Duration) -> Self {
        if store.supports_subscribe() {
            RefreshStrategy::Subscription
        } else {
            RefreshStrategy::Polling {
                interval: poll_interval,
            }
        }
    }
}

/// What the chart currently shows
#[derive(Debug, Clone, PartialEq)]
pub struct ChartState {
    pub records: Vec<Record>,
    /// True until the first load completes
    pub loading: bool,
    pub error: Option<String>,
    pub last_updated: Option<Timestamp>,
}

impl Default for ChartState {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            loading: true,
            error: None,
            last_updated: None,
        }
    }
}

impl ChartState {
    pub fn points(&self) -> Vec<ChartPoint> {
        self.records.iter().map(Record::chart_point).collect()
    }
}

struct Shared {
    store: Arc<dyn RecordStore>,
    state: watch::Sender<ChartState>,
    /// Last sequence number handed out
    issued: AtomicU64,
    /// Sequence number of the last applied fetch
    applied: Mutex<u64>,
}

impl Shared {
    async fn fetch(&self) {
        let seq = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let result = self.store.list_records().await;
        self.apply_fetch(seq, result);
    }

    fn apply_fetch(&self, seq: u64, result: StoreResult<Vec<Record>>) {
        let mut applied = match self.applied.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if seq < *applied {
            tracing::debug!(seq, applied = *applied, "Discarding stale fetch");
            return;
        }
        *applied = seq;

        match result {
            Ok(records) => self.apply_snapshot(records),
            Err(e) => self.apply_error(&e.to_string()),
        }
    }

    fn apply_snapshot(&self, records: Vec<Record>) {
        tracing::trace!(count = records.len(), "Chart updated");
        self.state.send_modify(|s| {
            s.records = records;
            s.loading = false;
            s.error = None;
            s.last_updated = Some(Timestamp::now());
        });
    }

    /// Records already shown stay visible behind the error
    fn apply_error(&self, cause: &str) {
        tracing::warn!(error = %cause, "Chart load failed");
        self.state.send_modify(|s| {
            s.loading = false;
            s.error = Some(LOAD_FAILED_MESSAGE.to_string());
        });
    }

    async fn follow(&self) {
        let mut subscription = match self.store.subscribe().await {
            Ok(subscription) => subscription,
            Err(e) => {
                self.apply_error(&e.to_string());
                return;
            }
        };

        while let Some(update) = subscription.next().await {
            match update {
                Ok(records) => self.apply_snapshot(records),
                Err(e) => {
                    self.apply_error(&e.to_string());
                    return;
                }
            }
        }

        tracing::debug!("Live subscription ended");
    }
}

/// Record list behind the bar chart
pub struct ChartView {
    shared: Arc<Shared>,
    strategy: RefreshStrategy,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ChartView {
    pub fn new(store: Arc<dyn RecordStore>, strategy: RefreshStrategy) -> Self {
        let (state, _) = watch::channel(ChartState::default());
        Self {
            shared: Arc::new(Shared {
                store,
                state,
                issued: AtomicU64::new(0),
                applied: Mutex::new(0),
            }),
            strategy,
            task: Mutex::new(None),
        }
    }

    pub fn strategy(&self) -> RefreshStrategy {
        self.strategy
    }

    pub fn state(&self) -> ChartState {
        self.shared.state.borrow().clone()
    }

    /// Watch the view for changes
    pub fn watch(&self) -> watch::Receiver<ChartState> {
        self.shared.state.subscribe()
    }

    pub fn is_mounted(&self) -> bool {
        self.lock_task().is_some()
    }

    /// Start refreshing: the first fetch (or subscription) begins at once
    ///
    /// Mounting an already mounted view does nothing.
    pub fn mount(&self) {
        let mut task = self.lock_task();
        if task.is_some() {
            return;
        }
        *task = Some(self.spawn_refresher());
        tracing::debug!(strategy = ?self.strategy, "Chart mounted");
    }

    /// Stop the poll timer or close the subscription
    pub fn unmount(&self) {
        if let Some(task) = self.lock_task().take() {
            task.abort();
            tracing::debug!("Chart unmounted");
        }
    }

    /// Bring the view up to date now
    ///
    /// Polling: one immediate fetch, outside the timer. Subscription: the
    /// live view needs no help unless it has ended, in which case it is
    /// reopened.
    pub async fn refresh(&self) {
        match self.strategy {
            RefreshStrategy::Polling { .. } => self.shared.fetch().await,
            RefreshStrategy::Subscription => {
                let mut task = self.lock_task();
                let ended = task.as_ref().map(JoinHandle::is_finished).unwrap_or(false);
                if ended {
                    tracing::info!("Reopening live subscription");
                    *task = Some(self.spawn_refresher());
                }
            }
        }
    }

    fn spawn_refresher(&self) -> JoinHandle<()> {
        let shared = Arc::clone(&self.shared);

        match self.strategy {
            RefreshStrategy::Polling { interval } => tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    ticker.tick().await;
                    shared.fetch().await;
                }
            }),
            RefreshStrategy::Subscription => tokio::spawn(async move { shared.follow().await }),
        }
    }

    fn lock_task(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        match self.task.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Drop for ChartView {
    fn drop(&mut self) {
        self.unmount();
    }
}
