//! Change subscriptions.

use crate::error::StoreResult;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use venuehub_model::Document;

/// The full result set of a subscribed query at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub collection: String,
    pub documents: Vec<Document>,
}

/// A standing subscription to a collection.
///
/// Snapshots arrive in order. Dropping the subscription (or calling
/// [`Subscription::cancel`]) stops the backend's delivery task.
#[derive(Debug)]
pub struct Subscription {
    receiver: mpsc::Receiver<StoreResult<Snapshot>>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Wraps a snapshot channel and the task feeding it.
    pub fn new(receiver: mpsc::Receiver<StoreResult<Snapshot>>, task: JoinHandle<()>) -> Self {
        Self {
            receiver,
            task: Some(task),
        }
    }

    /// Waits for the next snapshot. Returns `None` once the subscription
    /// has ended.
    pub async fn next(&mut self) -> Option<StoreResult<Snapshot>> {
        self.receiver.recv().await
    }

    /// Stops delivery. Snapshots already queued can still be drained.
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.receiver.close();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}
