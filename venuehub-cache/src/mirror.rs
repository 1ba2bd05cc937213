//! In-process mirror of one remote collection.

use std::sync::Arc;
use tokio::sync::{RwLock, watch};
use tracing::debug;
use venuehub_model::Record;
use venuehub_types::DocumentId;

#[derive(Debug)]
struct MirrorState<R> {
    entities: Arc<Vec<R>>,
    initialized: bool,
}

/// An ordered, atomically swapped copy of a collection.
///
/// Entities are kept newest first (`createdAt` descending, id ascending on
/// ties). Every mutation builds a new vector and swaps the `Arc`, so a reader
/// holding a [`snapshot`](Self::snapshot) sees either the old or the new
/// contents, never a mix.
#[derive(Debug)]
pub struct Mirror<R> {
    state: RwLock<MirrorState<R>>,
    version: watch::Sender<u64>,
}

impl<R: Record> Default for Mirror<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> Mirror<R> {
    /// Creates an empty, uninitialized mirror.
    pub fn new() -> Self {
        let (version, _) = watch::channel(0);
        Self {
            state: RwLock::new(MirrorState {
                entities: Arc::new(Vec::new()),
                initialized: false,
            }),
            version,
        }
    }

    /// Looks up an entity by id.
    pub async fn get(&self, id: &DocumentId) -> Option<R> {
        let state = self.state.read().await;
        state.entities.iter().find(|e| e.id() == id).cloned()
    }

    /// Returns the current contents.
    pub async fn snapshot(&self) -> Arc<Vec<R>> {
        Arc::clone(&self.state.read().await.entities)
    }

    pub async fn is_initialized(&self) -> bool {
        self.state.read().await.initialized
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.entities.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Replaces the whole contents and marks the mirror initialized.
    pub async fn replace_all(&self, mut entities: Vec<R>) {
        sort_newest_first(&mut entities);
        let count = entities.len();
        {
            let mut state = self.state.write().await;
            state.entities = Arc::new(entities);
            state.initialized = true;
        }
        self.bump();
        debug!("Mirror of {} replaced ({} entities)", R::schema().collection, count);
    }

    /// Inserts an entity or replaces the one with the same id.
    pub async fn upsert_one(&self, entity: R) {
        {
            let mut state = self.state.write().await;
            let mut entities: Vec<R> = state
                .entities
                .iter()
                .filter(|e| e.id() != entity.id())
                .cloned()
                .collect();
            entities.push(entity);
            sort_newest_first(&mut entities);
            state.entities = Arc::new(entities);
        }
        self.bump();
    }

    /// Removes an entity. Returns whether it was present.
    pub async fn remove_one(&self, id: &DocumentId) -> bool {
        {
            let mut state = self.state.write().await;
            if !state.entities.iter().any(|e| e.id() == id) {
                return false;
            }
            let entities: Vec<R> = state
                .entities
                .iter()
                .filter(|e| e.id() != id)
                .cloned()
                .collect();
            state.entities = Arc::new(entities);
        }
        self.bump();
        true
    }

    /// Marks the contents stale so the next plain read reloads. The entities
    /// stay readable through `get` and `snapshot` until then.
    pub async fn invalidate(&self) {
        self.state.write().await.initialized = false;
    }

    /// Number of swaps so far.
    pub fn version(&self) -> u64 {
        *self.version.borrow()
    }

    /// A receiver that changes on every swap.
    pub fn watch_version(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    fn bump(&self) {
        self.version.send_modify(|v| *v += 1);
    }
}

fn sort_newest_first<R: Record>(entities: &mut [R]) {
    entities.sort_by(|a, b| {
        b.created_at()
            .cmp(&a.created_at())
            .then_with(|| a.id().cmp(b.id()))
    });
}
