//! Read-through entity cache with live invalidation for VenueHub.
//!
//! Each entity service keeps an in-process [`Mirror`] of its remote
//! collection. The mirror is refreshed either by a standing subscription
//! that pushes full snapshots, or by forced reloads issued on request and
//! after every write.
//!
//! # Components
//!
//! - **Mirror**: the ordered, atomically swapped copy of one collection
//! - **Policy**: the [`SyncMode`] state machine and the [`SettleStrategy`]
//!   used after writes
//! - **Sync**: [`CollectionSync`], which applies the policy against a store
//! - **Services**: [`EntityService`] for hotels, users and vendors, plus
//!   [`AccountService`] for signup and login
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use venuehub_cache::{CacheConfig, Services};
//! use venuehub_store::MemoryStore;
//!
//! # async fn demo() -> venuehub_cache::ServiceResult<()> {
//! let services = Services::new(Arc::new(MemoryStore::new()), CacheConfig::default());
//! services.hotels.start_live_sync().await?;
//! let hotels = services.hotels.list_all(false).await?;
//! # let _ = hotels;
//! # Ok(())
//! # }
//! ```

mod account;
mod config;
mod error;
mod mirror;
pub mod policy;
mod service;
mod services;
mod sync;

pub use account::{
    AccountError, AccountResult, AccountService, BuiltinCredential, Session, SignupRequest,
    hash_password,
};
pub use config::CacheConfig;
pub use error::{ServiceError, ServiceResult};
pub use mirror::Mirror;
pub use policy::{ReadPlan, SettleStrategy, SyncEvent, SyncMode};
pub use service::{EntityService, HotelService, UserService, VendorService};
pub use services::Services;
pub use sync::{CollectionSync, WriteKind};
