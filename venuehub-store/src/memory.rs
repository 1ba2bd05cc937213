//! In-process implementation of [`DocumentStore`].
//!
//! Behaves like the remote store as far as the cache layer can tell:
//! - server timestamp sentinels become pending placeholders that resolve to
//!   the commit time after `commit_delay_ms`
//! - commit times are strictly increasing per store
//! - subscriptions deliver the full query result on every change
//!
//! Clones share the same backing data, which is how tests model several
//! processes talking to one store.

use crate::error::{StoreError, StoreResult};
use crate::query::Query;
use crate::store::{DocumentStore, is_server_timestamp};
use crate::subscription::{Snapshot, Subscription};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{RwLock, broadcast, mpsc};
use tracing::{debug, info};
use venuehub_model::{Document, Fields, field_at, set_field_at};
use venuehub_types::{DocumentId, PENDING_TIMESTAMP_KEY, Timestamp};

const CHANGE_CHANNEL_CAPACITY: usize = 256;
const SUBSCRIPTION_BUFFER: usize = 16;

/// Configuration for the in-memory store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryStoreConfig {
    /// How long commit timestamps stay pending after a write, in
    /// milliseconds. Zero resolves them as part of the write.
    pub commit_delay_ms: u64,
}

/// Call counters, for asserting how often the cache reached the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub point_reads: u64,
    pub queries: u64,
    pub writes: u64,
    pub subscriptions: u64,
}

type Collection = BTreeMap<DocumentId, Fields>;

#[derive(Debug)]
struct Inner {
    config: MemoryStoreConfig,
    collections: RwLock<HashMap<String, Collection>>,
    /// Last assigned commit time (ms).
    last_commit: Mutex<i64>,
    /// Names of collections that changed.
    changes: broadcast::Sender<String>,
    available: AtomicBool,
    point_reads: AtomicU64,
    queries: AtomicU64,
    writes: AtomicU64,
    subscriptions: AtomicU64,
}

/// An in-memory document store.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Creates an empty store that resolves timestamps inline.
    pub fn new() -> Self {
        Self::with_config(MemoryStoreConfig::default())
    }

    /// Creates an empty store with the given configuration.
    pub fn with_config(config: MemoryStoreConfig) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                config,
                collections: RwLock::new(HashMap::new()),
                last_commit: Mutex::new(i64::MIN),
                changes,
                available: AtomicBool::new(true),
                point_reads: AtomicU64::new(0),
                queries: AtomicU64::new(0),
                writes: AtomicU64::new(0),
                subscriptions: AtomicU64::new(0),
            }),
        }
    }

    pub fn config(&self) -> &MemoryStoreConfig {
        &self.inner.config
    }

    /// Simulates losing (or regaining) the connection to the store.
    pub fn set_available(&self, available: bool) {
        self.inner.available.store(available, Ordering::SeqCst);
    }

    pub fn is_available(&self) -> bool {
        self.inner.available.load(Ordering::SeqCst)
    }

    /// Returns the call counters.
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            point_reads: self.inner.point_reads.load(Ordering::SeqCst),
            queries: self.inner.queries.load(Ordering::SeqCst),
            writes: self.inner.writes.load(Ordering::SeqCst),
            subscriptions: self.inner.subscriptions.load(Ordering::SeqCst),
        }
    }

    /// Zeroes the call counters.
    pub fn reset_stats(&self) {
        for counter in [
            &self.inner.point_reads,
            &self.inner.queries,
            &self.inner.writes,
            &self.inner.subscriptions,
        ] {
            counter.store(0, Ordering::SeqCst);
        }
    }

    /// Stores a document verbatim, bypassing sentinel handling and call
    /// counters. Used to seed data written "by another client".
    pub async fn insert_raw(&self, collection: &str, id: DocumentId, fields: Fields) {
        self.inner
            .collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .insert(id, fields);
        self.notify(collection);
    }

    /// Number of documents in a collection.
    pub async fn len(&self, collection: &str) -> usize {
        self.inner
            .collections
            .read()
            .await
            .get(collection)
            .map_or(0, BTreeMap::len)
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.is_available() {
            Ok(())
        } else {
            Err(StoreError::Unavailable("memory store is offline".to_string()))
        }
    }

    /// Assigns the next commit time: wall clock, bumped past the previous
    /// commit so successive writes never share a timestamp.
    fn next_commit_time(&self) -> Timestamp {
        let mut last = self
            .inner
            .last_commit
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let next = Timestamp::now().as_millis().max(last.saturating_add(1));
        *last = next;
        Timestamp::from_millis(next)
    }

    /// Replaces server timestamp sentinels in `fields`. Returns the dotted
    /// paths left pending, which is empty when timestamps resolve inline.
    fn stamp(&self, fields: &mut Fields, commit: Timestamp) -> Vec<String> {
        let mut pending = Vec::new();
        stamp_into(fields, "", commit, self.inner.config.commit_delay_ms > 0, &mut pending);
        pending
    }

    fn notify(&self, collection: &str) {
        // No receivers just means nobody is subscribed.
        let _ = self.inner.changes.send(collection.to_string());
    }

    fn schedule_resolution(
        &self,
        collection: &str,
        id: &DocumentId,
        paths: Vec<String>,
        commit: Timestamp,
    ) {
        if paths.is_empty() {
            return;
        }
        let store = self.clone();
        let collection = collection.to_string();
        let id = id.clone();
        let delay = Duration::from_millis(self.inner.config.commit_delay_ms);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            store.resolve_pending(&collection, &id, &paths, commit).await;
        });
    }

    async fn resolve_pending(
        &self,
        collection: &str,
        id: &DocumentId,
        paths: &[String],
        commit: Timestamp,
    ) {
        let mut resolved = false;
        {
            let mut collections = self.inner.collections.write().await;
            let Some(fields) = collections.get_mut(collection).and_then(|c| c.get_mut(id)) else {
                return;
            };
            for path in paths {
                // Only resolve our own placeholder; a later write may have
                // replaced it with its own.
                let ours = field_at(fields, path)
                    .and_then(|v| v.get(PENDING_TIMESTAMP_KEY))
                    .and_then(|p| p.get("estimate"))
                    .and_then(Value::as_i64)
                    == Some(commit.as_millis());
                if ours {
                    set_field_at(fields, path, commit.to_marker());
                    resolved = true;
                }
            }
        }
        if resolved {
            debug!("Resolved commit time {} for {}/{}", commit, collection, id);
            self.notify(collection);
        }
    }

    async fn snapshot(&self, collection: &str, query: &Query) -> Vec<Document> {
        let collections = self.inner.collections.read().await;
        let docs = collections
            .get(collection)
            .into_iter()
            .flatten()
            .map(|(id, fields)| Document::new(id.clone(), fields.clone()));
        query.apply(docs)
    }
}

fn stamp_into(
    fields: &mut Fields,
    prefix: &str,
    commit: Timestamp,
    deferred: bool,
    pending: &mut Vec<String>,
) {
    for (key, value) in fields.iter_mut() {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        if is_server_timestamp(value) {
            if deferred {
                *value = Timestamp::pending_marker(commit);
                pending.push(path);
            } else {
                *value = commit.to_marker();
            }
        } else if let Value::Object(inner) = value {
            stamp_into(inner, &path, commit, deferred, pending);
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, collection: &str, id: &DocumentId) -> StoreResult<Option<Document>> {
        self.check_available()?;
        self.inner.point_reads.fetch_add(1, Ordering::SeqCst);
        let collections = self.inner.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|c| c.get(id))
            .map(|fields| Document::new(id.clone(), fields.clone())))
    }

    async fn query(&self, collection: &str, query: &Query) -> StoreResult<Vec<Document>> {
        self.check_available()?;
        self.inner.queries.fetch_add(1, Ordering::SeqCst);
        Ok(self.snapshot(collection, query).await)
    }

    async fn add(&self, collection: &str, mut fields: Fields) -> StoreResult<DocumentId> {
        self.check_available()?;
        self.inner.writes.fetch_add(1, Ordering::SeqCst);

        let id = DocumentId::generate();
        let commit = self.next_commit_time();
        let pending = self.stamp(&mut fields, commit);
        self.inner
            .collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), fields);

        debug!("Added {}/{} at {}", collection, id, commit);
        self.notify(collection);
        self.schedule_resolution(collection, &id, pending, commit);
        Ok(id)
    }

    async fn update(&self, collection: &str, id: &DocumentId, mut patch: Fields) -> StoreResult<()> {
        self.check_available()?;
        self.inner.writes.fetch_add(1, Ordering::SeqCst);

        let commit = self.next_commit_time();
        let pending = self.stamp(&mut patch, commit);
        {
            let mut collections = self.inner.collections.write().await;
            let Some(fields) = collections.get_mut(collection).and_then(|c| c.get_mut(id)) else {
                return Err(StoreError::NotFound {
                    collection: collection.to_string(),
                    id: id.to_string(),
                });
            };
            for (key, value) in patch {
                set_field_at(fields, &key, value);
            }
        }

        debug!("Updated {}/{} at {}", collection, id, commit);
        self.notify(collection);
        self.schedule_resolution(collection, id, pending, commit);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &DocumentId) -> StoreResult<()> {
        self.check_available()?;
        self.inner.writes.fetch_add(1, Ordering::SeqCst);

        let removed = self
            .inner
            .collections
            .write()
            .await
            .get_mut(collection)
            .and_then(|c| c.remove(id))
            .is_some();
        if removed {
            debug!("Deleted {}/{}", collection, id);
            self.notify(collection);
        }
        Ok(())
    }

    async fn subscribe(&self, collection: &str, query: &Query) -> StoreResult<Subscription> {
        self.check_available()?;
        self.inner.subscriptions.fetch_add(1, Ordering::SeqCst);

        // Subscribe to changes before taking the first snapshot so nothing
        // committed in between is missed.
        let mut changes = self.inner.changes.subscribe();
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let initial = Snapshot {
            collection: collection.to_string(),
            documents: self.snapshot(collection, query).await,
        };
        // The buffer is empty, so this cannot wait.
        let _ = tx.send(Ok(initial)).await;
        info!("Subscribed to {}", collection);

        let store = self.clone();
        let collection = collection.to_string();
        let query = query.clone();
        let task = tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(changed) if changed != collection => continue,
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => break,
                }
                let delivery = if store.is_available() {
                    Ok(Snapshot {
                        collection: collection.clone(),
                        documents: store.snapshot(&collection, &query).await,
                    })
                } else {
                    Err(StoreError::Unavailable("subscription interrupted".to_string()))
                };
                if tx.send(delivery).await.is_err() {
                    break;
                }
            }
            debug!("Subscription to {} ended", collection);
        });

        Ok(Subscription::new(rx, task))
    }
}
