//! Error types for the store boundary.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors a remote store call can fail with.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// An update targeted a document that does not exist.
    #[error("document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    /// A document did not have the expected shape.
    #[error("malformed document: {0}")]
    Malformed(String),

    /// The subscription stream ended.
    #[error("subscription closed")]
    SubscriptionClosed,
}
