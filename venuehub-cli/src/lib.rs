//! Scripted scenarios for the VenueHub cache.
//!
//! Runs two service instances ("processes") over one in-memory store: one
//! following the collection live, the other relying on forced reloads. The
//! resulting [`ScenarioReport`] shows what each side observed.

use anyhow::{Context, Result, bail};
use serde::Serialize;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use venuehub_cache::{CacheConfig, Services, SignupRequest};
use venuehub_model::{Fields, Role};
use venuehub_store::{MemoryStore, MemoryStoreConfig};

/// Knobs for [`run_scenario`].
#[derive(Debug, Clone, Default)]
pub struct ScenarioOptions {
    /// Delay before the store resolves commit timestamps.
    pub commit_delay_ms: u64,
    /// Whether the observing process subscribes live.
    pub live: bool,
    pub cache: CacheConfig,
}

/// What the scenario observed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioReport {
    pub hotel_id: String,
    pub city_before: String,
    pub city_after: String,
    pub created_at: String,
    pub updated_at: String,
    /// Whether the writer's own read reflected its update immediately.
    pub writer_read_own_write: bool,
    /// Whether the observing process saw the new hotel.
    pub observer_saw_create: bool,
    pub observer_mode: String,
    pub account_email: String,
    pub login_role: String,
    pub store_point_reads: u64,
    pub store_queries: u64,
    pub store_writes: u64,
}

/// Reads a JSON cache configuration, or the defaults when `path` is `None`.
pub fn load_config(path: Option<&Path>) -> Result<CacheConfig> {
    let Some(path) = path else {
        return Ok(CacheConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    CacheConfig::from_json(&text)
        .with_context(|| format!("Failed to parse config file {}", path.display()))
}

fn object(value: serde_json::Value) -> Result<Fields> {
    match value {
        serde_json::Value::Object(map) => Ok(map),
        other => bail!("expected a JSON object, got {other}"),
    }
}

/// Runs the create / update / observe / signup scenario.
pub async fn run_scenario(options: ScenarioOptions) -> Result<ScenarioReport> {
    let store = MemoryStore::with_config(MemoryStoreConfig {
        commit_delay_ms: options.commit_delay_ms,
    });
    let writer = Services::new(Arc::new(store.clone()), options.cache.clone());
    let observer = Services::new(Arc::new(store.clone()), options.cache);

    if options.live {
        observer
            .start_live_sync()
            .await
            .context("Observer could not start live sync")?;
    }

    let created = writer
        .hotels
        .create(object(json!({
            "name": "Grand Inn",
            "location": {"city": "Pune", "state": "Maharashtra"},
            "category": "hotel",
            "amenities": ["Parking", "Banquet hall"],
        }))?)
        .await
        .context("Creating the hotel failed")?;
    info!("Writer created hotel {}", created.id);

    let listed = writer.hotels.list_all(false).await?;
    if !listed.iter().any(|h| h.id == created.id) {
        bail!("Writer's listing is missing its own hotel {}", created.id);
    }

    writer
        .hotels
        .update(&created.id, object(json!({"location.city": "Mumbai"}))?)
        .await
        .context("Updating the hotel failed")?;
    let fetched = writer.hotels.get_by_id(&created.id).await?;
    info!("Writer reads city {}", fetched.location.city);

    let observer_saw_create = if options.live {
        let mut version = observer.hotels.mirror().watch_version();
        tokio::time::timeout(Duration::from_secs(5), async {
            while observer.hotels.mirror().get(&created.id).await.is_none() {
                if version.changed().await.is_err() {
                    break;
                }
            }
        })
        .await
        .is_ok()
            && observer.hotels.mirror().get(&created.id).await.is_some()
    } else {
        observer
            .hotels
            .list_all(true)
            .await?
            .iter()
            .any(|h| h.id == created.id)
    };

    let account = writer
        .signup(SignupRequest {
            role: Role::User,
            email: "guest@venuehub.test".to_string(),
            password: "guest-pass".to_string(),
            name: "Demo Guest".to_string(),
            profile: Fields::new(),
        })
        .await
        .context("Signup failed")?;
    let session = writer
        .accounts
        .login(&account.email, "guest-pass")
        .await
        .context("Login failed")?;

    let observer_mode = observer.hotels.mode().await.to_string();
    observer.stop_live_sync().await;

    let stats = store.stats();
    Ok(ScenarioReport {
        hotel_id: created.id.to_string(),
        city_before: created.location.city,
        city_after: fetched.location.city.clone(),
        created_at: created.created_at.to_rfc3339(),
        updated_at: fetched.updated_at.to_rfc3339(),
        writer_read_own_write: fetched.location.city == "Mumbai",
        observer_saw_create,
        observer_mode,
        account_email: account.email,
        login_role: session.role.to_string(),
        store_point_reads: stats.point_reads,
        store_queries: stats.queries,
        store_writes: stats.writes,
    })
}
