//! Core type definitions for VenueHub.
//!
//! This crate defines the small, domain-agnostic types shared by the store,
//! model and cache crates:
//! - Document identifiers assigned by the remote store
//! - Canonical timestamps and the normalizer for raw store timestamps
//!
//! Hotel, user and vendor records live in `venuehub-model`, not here.

mod ids;
mod timestamp;

pub use ids::DocumentId;
pub use timestamp::{PENDING_TIMESTAMP_KEY, RawTimestamp, Timestamp, ToTimestamp};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid document id: {0:?}")]
    InvalidId(String),
}
