//! Live snapshot subscriptions
//!
//! A `Subscription` owns the task that produces snapshots. Dropping it (or
//! calling `unsubscribe`) aborts that task, which closes whatever channel the
//! task was listening on.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::error::{StoreError, StoreResult};
use crate::record::Record;

/// Snapshots buffered between producer and consumer
const SNAPSHOT_BUFFER: usize = 16;

/// Handle to a live, newest-first view of the collection
pub struct Subscription {
    updates: mpsc::Receiver<StoreResult<Vec<Record>>>,
    task: JoinHandle<()>,
}

impl Subscription {
    /// Spawn `producer` and wire its sink to a new subscription
    pub(crate) fn spawn<F, Fut>(producer: F) -> Self
    where
        F: FnOnce(SnapshotSink) -> Fut,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(SNAPSHOT_BUFFER);
        let task = tokio::spawn(producer(SnapshotSink { tx }));

        Self { updates: rx, task }
    }

    /// Wait for the next full snapshot
    ///
    /// Returns `None` once the subscription has ended. An `Err` is always the
    /// last item delivered.
    pub async fn next(&mut self) -> Option<StoreResult<Vec<Record>>> {
        self.updates.recv().await
    }

    /// Stop listening
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Producer side of a subscription
pub(crate) struct SnapshotSink {
    tx: mpsc::Sender<StoreResult<Vec<Record>>>,
}

impl SnapshotSink {
    /// Push a snapshot; `false` means the consumer is gone
    pub async fn push(&self, records: Vec<Record>) -> bool {
        self.tx.send(Ok(records)).await.is_ok()
    }

    /// Deliver a terminal error
    pub async fn fail(self, err: StoreError) {
        let _ = self.tx.send(Err(err)).await;
    }
}
