//! Entity service façade, one implementation for every entity kind.

use crate::config::CacheConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::mirror::Mirror;
use crate::policy::SyncMode;
use crate::sync::{CollectionSync, WriteKind, transport_error};
use std::sync::Arc;
use tracing::{info, warn};
use venuehub_model::{
    CREATED_AT, Fields, Hotel, Record, UPDATED_AT, User, Vendor, validate_draft, validate_patch,
};
use venuehub_store::{DocumentStore, server_timestamp};
use venuehub_types::DocumentId;

pub type HotelService = EntityService<Hotel>;
pub type UserService = EntityService<User>;
pub type VendorService = EntityService<Vendor>;

/// Cached CRUD, listing and search over one collection.
///
/// Reads are served from the collection's [`Mirror`], loading it on first
/// use. Writes go to the store and then reconcile the mirror before
/// returning, so a read that follows a successful write sees it.
pub struct EntityService<R: Record> {
    store: Arc<dyn DocumentStore>,
    sync: CollectionSync<R>,
}

impl<R: Record> EntityService<R> {
    pub fn new(store: Arc<dyn DocumentStore>, config: &CacheConfig) -> Self {
        let sync = CollectionSync::new(Arc::clone(&store), config.settle);
        Self { store, sync }
    }

    pub fn collection(&self) -> &'static str {
        R::schema().collection
    }

    pub fn mirror(&self) -> &Arc<Mirror<R>> {
        self.sync.mirror()
    }

    pub async fn mode(&self) -> SyncMode {
        self.sync.mode().await
    }

    /// Creates an entity from caller-supplied fields.
    ///
    /// `id`, `createdAt` and `updatedAt` are assigned by the store and may
    /// not be supplied.
    pub async fn create(&self, mut fields: Fields) -> ServiceResult<R> {
        validate_draft::<R>(&fields)?;
        fields.insert(CREATED_AT.to_string(), server_timestamp());
        fields.insert(UPDATED_AT.to_string(), server_timestamp());

        let collection = self.collection();
        let id = self
            .store
            .add(collection, fields)
            .await
            .map_err(|e| transport_error(collection, "create", e))?;
        info!("Created {}/{}", collection, id);

        self.sync
            .reconcile_write(&id, WriteKind::Upsert)
            .await?
            .ok_or_else(|| ServiceError::not_found(collection, &id))
    }

    /// Looks an entity up in the mirror, falling back to one point read.
    pub async fn get_by_id(&self, id: &DocumentId) -> ServiceResult<R> {
        self.sync
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(self.collection(), id))
    }

    /// Lists every entity, newest first.
    pub async fn list_all(&self, force_refresh: bool) -> ServiceResult<Vec<R>> {
        Ok(self.sync.list(force_refresh).await?.to_vec())
    }

    /// Entities whose status is active.
    pub async fn list_active(&self) -> ServiceResult<Vec<R>> {
        self.filtered(|e| e.is_active()).await
    }

    /// Entities in a category (hotel type, user role, vendor service type).
    /// Matching ignores ASCII case.
    pub async fn list_by_category(&self, category: &str) -> ServiceResult<Vec<R>> {
        let category = category.trim();
        self.filtered(|e| e.category().is_some_and(|c| c.eq_ignore_ascii_case(category)))
            .await
    }

    /// Case-insensitive substring search over the kind's searchable fields.
    /// A blank query returns everything.
    pub async fn search(&self, query: &str) -> ServiceResult<Vec<R>> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.list_all(false).await;
        }
        self.filtered(|e| e.matches_search(&needle)).await
    }

    async fn filtered(&self, keep: impl Fn(&R) -> bool) -> ServiceResult<Vec<R>> {
        let entities = self.sync.list(false).await?;
        Ok(entities.iter().filter(|e| keep(e)).cloned().collect())
    }

    /// Merges `patch` into an entity. Dotted keys address nested fields.
    pub async fn update(&self, id: &DocumentId, mut patch: Fields) -> ServiceResult<R> {
        validate_patch::<R>(&patch)?;
        patch.insert(UPDATED_AT.to_string(), server_timestamp());

        let collection = self.collection();
        self.store
            .update(collection, id, patch)
            .await
            .map_err(|e| transport_error(collection, "update", e))?;
        info!("Updated {}/{}", collection, id);

        self.sync
            .reconcile_write(id, WriteKind::Upsert)
            .await?
            .ok_or_else(|| ServiceError::not_found(collection, id))
    }

    /// Deletes an entity. Fails with `NotFound` if it does not exist.
    pub async fn delete(&self, id: &DocumentId) -> ServiceResult<()> {
        self.get_by_id(id).await?;

        let collection = self.collection();
        self.store
            .delete(collection, id)
            .await
            .map_err(|e| transport_error(collection, "delete", e))?;
        info!("Deleted {}/{}", collection, id);

        self.sync.reconcile_write(id, WriteKind::Delete).await?;
        Ok(())
    }

    /// Subscribes to the collection so the mirror follows remote changes.
    pub async fn start_live_sync(&self) -> ServiceResult<()> {
        self.sync.start_live_sync().await
    }

    pub async fn stop_live_sync(&self) {
        self.sync.stop_live_sync().await;
    }

    /// Brings a loaded mirror up to date after a write made outside this
    /// façade. A mirror that was never loaded is left to load lazily; if the
    /// reload fails the mirror is invalidated instead.
    pub async fn refresh_after_external_write(&self) {
        if !self.mirror().is_initialized().await {
            return;
        }
        if let Err(err) = self.sync.force_reload().await {
            warn!("Reload of {} after external write failed: {}", self.collection(), err);
            self.mirror().invalidate().await;
        }
    }
}
