//! All services over one store.

use crate::account::{AccountResult, AccountService, SignupRequest};
use crate::config::CacheConfig;
use crate::error::ServiceResult;
use crate::service::{HotelService, UserService, VendorService};
use std::sync::Arc;
use venuehub_model::{AuthAccount, Role};
use venuehub_store::DocumentStore;

/// The hotel, user and vendor façades plus account provisioning, sharing one
/// store. Each façade owns its collection's mirror.
pub struct Services {
    pub hotels: HotelService,
    pub users: UserService,
    pub vendors: VendorService,
    pub accounts: AccountService,
}

impl Services {
    pub fn new(store: Arc<dyn DocumentStore>, config: CacheConfig) -> Self {
        Self {
            hotels: HotelService::new(Arc::clone(&store), &config),
            users: UserService::new(Arc::clone(&store), &config),
            vendors: VendorService::new(Arc::clone(&store), &config),
            accounts: AccountService::new(store, config.builtin_credentials),
        }
    }

    /// Opens an account and refreshes the mirror of the collection its
    /// profile was written to, so cached listings include it.
    pub async fn signup(&self, request: SignupRequest) -> AccountResult<AuthAccount> {
        let role = request.role;
        let account = self.accounts.signup(request).await?;
        match role {
            Role::Hotel => self.hotels.refresh_after_external_write().await,
            Role::User => self.users.refresh_after_external_write().await,
            Role::Vendor => self.vendors.refresh_after_external_write().await,
            Role::Admin => {}
        }
        Ok(account)
    }

    /// Starts live sync on every cached collection.
    pub async fn start_live_sync(&self) -> ServiceResult<()> {
        self.hotels.start_live_sync().await?;
        self.users.start_live_sync().await?;
        self.vendors.start_live_sync().await
    }

    pub async fn stop_live_sync(&self) {
        self.hotels.stop_live_sync().await;
        self.users.stop_live_sync().await;
        self.vendors.stop_live_sync().await;
    }
}
