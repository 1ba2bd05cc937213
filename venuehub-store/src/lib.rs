//! Remote document store boundary for VenueHub.
//!
//! The authoritative data lives in a remote document store that offers point
//! reads, predicate queries, ordered queries, writes with server-assigned
//! timestamps and per-collection change subscriptions. This crate defines
//! that boundary as the [`DocumentStore`] trait so the cache layer can work
//! with any backend.
//!
//! # Commit timestamps
//!
//! Writers put [`server_timestamp()`] in a field to ask for the commit time.
//! The store first records a pending placeholder and resolves it later, so
//! a read racing a write may see either shape. Readers normalize with
//! `venuehub_types::Timestamp::normalize`.
//!
//! # In-memory store
//!
//! [`MemoryStore`] implements the trait in process. It reproduces delayed
//! timestamp resolution and full-snapshot subscriptions, and exposes call
//! counters and an availability switch for tests.

mod error;
mod memory;
mod query;
mod store;
mod subscription;

pub use error::{StoreError, StoreResult};
pub use memory::{MemoryStore, MemoryStoreConfig, StoreStats};
pub use query::{Filter, Query};
pub use store::{DocumentStore, SERVER_TIMESTAMP_SENTINEL, is_server_timestamp, server_timestamp};
pub use subscription::{Snapshot, Subscription};
pub use venuehub_model::{Direction, OrderBy};
