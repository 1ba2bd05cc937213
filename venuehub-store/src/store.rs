//! The document store trait.

use crate::error::StoreResult;
use crate::query::Query;
use crate::subscription::Subscription;
use async_trait::async_trait;
use serde_json::{Value, json};
use venuehub_model::{Document, Fields};
use venuehub_types::DocumentId;

/// Key of the sentinel object that requests a server-assigned timestamp.
pub const SERVER_TIMESTAMP_SENTINEL: &str = "__serverTimestamp";

/// A field value asking the store to fill in the commit time.
pub fn server_timestamp() -> Value {
    json!({ SERVER_TIMESTAMP_SENTINEL: true })
}

/// Returns true if `value` is the server timestamp sentinel.
pub fn is_server_timestamp(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|map| map.len() == 1 && map.contains_key(SERVER_TIMESTAMP_SENTINEL))
}

/// Abstract remote document store.
///
/// Every call is a suspension point. Commit timestamps written by `add` and
/// `update` are not guaranteed to be resolved until a later read.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Returns the name of the backend.
    fn backend_name(&self) -> &'static str;

    /// Reads one document. `Ok(None)` when it does not exist.
    async fn get(&self, collection: &str, id: &DocumentId) -> StoreResult<Option<Document>>;

    /// Runs a predicate / ordered query over a collection.
    async fn query(&self, collection: &str, query: &Query) -> StoreResult<Vec<Document>>;

    /// Creates a document and returns its store-assigned id.
    async fn add(&self, collection: &str, fields: Fields) -> StoreResult<DocumentId>;

    /// Merges `patch` into an existing document. Dotted keys address nested
    /// fields. Fails with `NotFound` if the document does not exist.
    async fn update(&self, collection: &str, id: &DocumentId, patch: Fields) -> StoreResult<()>;

    /// Deletes a document. Deleting a missing document succeeds.
    async fn delete(&self, collection: &str, id: &DocumentId) -> StoreResult<()>;

    /// Subscribes to a collection. The first snapshot is delivered
    /// immediately; every later change delivers the full current result of
    /// `query`, not a delta.
    async fn subscribe(&self, collection: &str, query: &Query) -> StoreResult<Subscription>;
}
