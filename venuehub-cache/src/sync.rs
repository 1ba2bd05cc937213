//! Keeps one collection's mirror in step with the store.

use crate::error::{ServiceError, ServiceResult};
use crate::mirror::Mirror;
use crate::policy::{ReadPlan, SettleStrategy, SyncEvent, SyncMode};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use venuehub_model::{Document, ModelResult, Record, UPDATED_AT, decode};
use venuehub_store::{DocumentStore, Query, StoreError, Subscription};
use venuehub_types::DocumentId;

/// The kind of write being reconciled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    /// Create or update: the document should exist afterwards.
    Upsert,
    Delete,
}

/// Mirror plus the policy state that decides when to refresh it.
pub struct CollectionSync<R: Record> {
    store: Arc<dyn DocumentStore>,
    mirror: Arc<Mirror<R>>,
    mode: Arc<RwLock<SyncMode>>,
    live: Mutex<Option<JoinHandle<()>>>,
    settle: SettleStrategy,
}

impl<R: Record> CollectionSync<R> {
    pub fn new(store: Arc<dyn DocumentStore>, settle: SettleStrategy) -> Self {
        Self {
            store,
            mirror: Arc::new(Mirror::new()),
            mode: Arc::new(RwLock::new(SyncMode::Uninitialized)),
            live: Mutex::new(None),
            settle,
        }
    }

    pub fn collection(&self) -> &'static str {
        R::schema().collection
    }

    pub fn mirror(&self) -> &Arc<Mirror<R>> {
        &self.mirror
    }

    pub fn settle_strategy(&self) -> SettleStrategy {
        self.settle
    }

    pub async fn mode(&self) -> SyncMode {
        *self.mode.read().await
    }

    /// The full, ordered query used for reloads and subscriptions.
    fn ordered_query() -> Query {
        Query::all().order_by(R::schema().order_by.clone())
    }

    async fn transition(&self, event: SyncEvent) -> SyncMode {
        apply_event(&self.mode, event).await
    }

    /// Subscribes to the collection. The first snapshot is applied before
    /// this returns; later ones are applied by a background task until
    /// [`stop_live_sync`](Self::stop_live_sync). Calling it again while live
    /// is a no-op.
    pub async fn start_live_sync(&self) -> ServiceResult<()> {
        let mut live = self.live.lock().await;
        if live.as_ref().is_some_and(|task| !task.is_finished()) {
            return Ok(());
        }

        let collection = self.collection();
        let mut subscription = self
            .store
            .subscribe(collection, &Self::ordered_query())
            .await
            .map_err(|e| transport_error(collection, "subscribe", e))?;

        match subscription.next().await {
            Some(Ok(snapshot)) => {
                let entities =
                    decode_all::<R>(&snapshot.documents).map_err(ServiceError::from)?;
                self.mirror.replace_all(entities).await;
            }
            Some(Err(e)) => return Err(transport_error(collection, "subscribe", e)),
            None => {
                return Err(transport_error(
                    collection,
                    "subscribe",
                    StoreError::SubscriptionClosed,
                ));
            }
        }

        self.transition(SyncEvent::LiveSyncStarted).await;
        *live = Some(tokio::spawn(run_subscription(
            subscription,
            Arc::clone(&self.mirror),
            Arc::clone(&self.mode),
        )));
        info!("Live sync started for {} ({})", collection, self.store.backend_name());
        Ok(())
    }

    /// Cancels the subscription, if any.
    pub async fn stop_live_sync(&self) {
        let Some(task) = self.live.lock().await.take() else {
            return;
        };
        task.abort();
        let loaded = self.mirror.is_initialized().await;
        self.transition(SyncEvent::LiveSyncStopped { loaded }).await;
        info!("Live sync stopped for {}", self.collection());
    }

    /// Queries the whole collection and replaces the mirror.
    pub async fn force_reload(&self) -> ServiceResult<Arc<Vec<R>>> {
        self.reload(SyncEvent::ForcedReload).await
    }

    async fn reload(&self, event: SyncEvent) -> ServiceResult<Arc<Vec<R>>> {
        let collection = self.collection();
        let docs = self
            .store
            .query(collection, &Self::ordered_query())
            .await
            .map_err(|e| transport_error(collection, "reload", e))?;
        let entities = decode_all::<R>(&docs).map_err(|e| {
            warn!("Reload of {} returned an unreadable document: {}", collection, e);
            ServiceError::from(e)
        })?;
        self.mirror.replace_all(entities).await;
        self.transition(event).await;
        Ok(self.mirror.snapshot().await)
    }

    /// Lists the collection, reloading first if forced or never loaded.
    pub async fn list(&self, force_refresh: bool) -> ServiceResult<Arc<Vec<R>>> {
        let initialized = self.mirror.is_initialized().await;
        match self.mode().await.plan_read(initialized, force_refresh) {
            ReadPlan::ServeMirror => Ok(self.mirror.snapshot().await),
            ReadPlan::Reload if force_refresh => self.reload(SyncEvent::ForcedReload).await,
            ReadPlan::Reload => {
                debug!("Lazy first load of {}", self.collection());
                self.reload(SyncEvent::LazyLoad).await
            }
        }
    }

    /// Mirror first, then a single point read.
    pub async fn get(&self, id: &DocumentId) -> ServiceResult<Option<R>> {
        if let Some(entity) = self.mirror.get(id).await {
            return Ok(Some(entity));
        }
        let entity = self.point_read(id).await?;
        if let Some(entity) = &entity
            && self.mirror.is_initialized().await
        {
            self.mirror.upsert_one(entity.clone()).await;
        }
        Ok(entity)
    }

    async fn point_read(&self, id: &DocumentId) -> ServiceResult<Option<R>> {
        let collection = self.collection();
        let doc = self
            .store
            .get(collection, id)
            .await
            .map_err(|e| transport_error(collection, "read", e))?;
        Ok(doc.as_ref().map(decode::<R>).transpose()?)
    }

    /// Brings the mirror up to date after a successful write.
    ///
    /// Waits per the settle strategy, patches the mirror with the written
    /// document, then does a full reload. Returns the written entity (`None`
    /// after a delete, or if the document vanished in the meantime).
    pub async fn reconcile_write(
        &self,
        id: &DocumentId,
        kind: WriteKind,
    ) -> ServiceResult<Option<R>> {
        self.settle_after_write(id, kind).await;

        let written = match kind {
            WriteKind::Upsert => {
                let entity = self.point_read(id).await?;
                if let Some(entity) = &entity {
                    self.mirror.upsert_one(entity.clone()).await;
                }
                entity
            }
            WriteKind::Delete => {
                self.mirror.remove_one(id).await;
                None
            }
        };

        if let Err(e) = self.force_reload().await {
            // The write itself went through; leave the mirror marked stale
            // so the next read retries the reload.
            warn!(
                "Reload of {} after writing {} failed, mirror marked stale: {}",
                self.collection(),
                id,
                e
            );
            self.mirror.invalidate().await;
            return Ok(written);
        }

        Ok(match kind {
            WriteKind::Upsert => self.mirror.get(id).await.or(written),
            WriteKind::Delete => None,
        })
    }

    /// Waits for the store to show a write, per the settle strategy.
    async fn settle_after_write(&self, id: &DocumentId, kind: WriteKind) {
        match self.settle {
            SettleStrategy::None => {}
            SettleStrategy::FixedDelay { delay_ms } => {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
            SettleStrategy::PollUntilResolved {
                interval_ms,
                max_attempts,
            } => {
                let collection = self.collection();
                for attempt in 1..=max_attempts {
                    let settled = match self.store.get(collection, id).await {
                        Ok(Some(doc)) => kind == WriteKind::Upsert && is_settled(&doc),
                        Ok(None) => kind == WriteKind::Delete,
                        Err(e) => {
                            warn!("Settle poll for {}/{} failed: {}", collection, id, e);
                            return;
                        }
                    };
                    if settled {
                        debug!("{}/{} settled after {} poll(s)", collection, id, attempt);
                        return;
                    }
                    tokio::time::sleep(Duration::from_millis(interval_ms)).await;
                }
                warn!(
                    "{}/{} not settled after {} polls, reloading anyway",
                    collection, id, max_attempts
                );
            }
        }
    }
}

impl<R: Record> Drop for CollectionSync<R> {
    fn drop(&mut self) {
        if let Some(task) = self.live.get_mut().take() {
            task.abort();
        }
    }
}

fn is_settled(doc: &Document) -> bool {
    doc.raw_timestamp(UPDATED_AT).is_resolved()
}

async fn apply_event(mode: &RwLock<SyncMode>, event: SyncEvent) -> SyncMode {
    let mut mode = mode.write().await;
    let next = mode.on(event);
    if next != *mode {
        debug!("Sync mode {} -> {}", *mode, next);
    }
    *mode = next;
    next
}

/// Applies subscription deliveries until the stream ends.
async fn run_subscription<R: Record>(
    mut subscription: Subscription,
    mirror: Arc<Mirror<R>>,
    mode: Arc<RwLock<SyncMode>>,
) {
    let collection = R::schema().collection;
    while let Some(delivery) = subscription.next().await {
        match delivery {
            Ok(snapshot) => match decode_all::<R>(&snapshot.documents) {
                Ok(entities) => mirror.replace_all(entities).await,
                Err(e) => warn!("Dropped {} snapshot with an unreadable document: {}", collection, e),
            },
            Err(e) => warn!("Subscription to {} reported an error: {}", collection, e),
        }
    }
    let loaded = mirror.is_initialized().await;
    apply_event(&mode, SyncEvent::LiveSyncStopped { loaded }).await;
    warn!("Subscription to {} ended", collection);
}

pub(crate) fn decode_all<R: Record>(docs: &[Document]) -> ModelResult<Vec<R>> {
    docs.iter().map(decode::<R>).collect()
}

/// Logs a failed store call and converts it. A store-side `NotFound` keeps
/// its meaning.
pub(crate) fn transport_error(collection: &str, operation: &str, err: StoreError) -> ServiceError {
    match err {
        StoreError::NotFound { id, .. } => ServiceError::not_found(collection, id),
        other => {
            warn!("{} on {} failed: {}", operation, collection, other);
            ServiceError::Transport(other)
        }
    }
}
