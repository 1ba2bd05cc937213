use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use venuehub_cache::{
    CacheConfig, HotelService, ServiceError, SettleStrategy, SyncMode, UserService, VendorService,
};
use venuehub_model::{Fields, Hotel, Record};
use venuehub_store::{DocumentStore, MemoryStore, MemoryStoreConfig, StoreError, StoreStats};
use venuehub_types::{DocumentId, Timestamp};

fn fields(value: Value) -> Fields {
    match value {
        Value::Object(map) => map,
        _ => panic!("expected object"),
    }
}

fn hotel_service(store: &MemoryStore) -> HotelService {
    HotelService::new(Arc::new(store.clone()), &CacheConfig::default())
}

fn hotel_service_with(store: &MemoryStore, settle: SettleStrategy) -> HotelService {
    let config = CacheConfig {
        settle,
        ..CacheConfig::default()
    };
    HotelService::new(Arc::new(store.clone()), &config)
}

fn grand_inn() -> Fields {
    fields(json!({
        "name": "Grand Inn",
        "location": {"city": "Pune", "state": "Maharashtra"},
        "category": "hotel",
    }))
}

/// Seeds a document as if another client had written it.
async fn seed(store: &MemoryStore, collection: &str, id: &str, value: Value) -> DocumentId {
    let id = DocumentId::parse(id).unwrap();
    store.insert_raw(collection, id.clone(), fields(value)).await;
    id
}

// ── Scenarios ────────────────────────────────────────────────────

#[tokio::test]
async fn grand_inn_create_list_update() {
    let store = MemoryStore::new();
    let hotels = hotel_service(&store);

    let created = hotels.create(grand_inn()).await.unwrap();
    assert_eq!(created.name, "Grand Inn");
    assert!(
        hotels
            .list_all(false)
            .await
            .unwrap()
            .iter()
            .any(|h| h.id == created.id)
    );

    hotels
        .update(&created.id, fields(json!({"location.city": "Mumbai"})))
        .await
        .unwrap();

    let fetched = hotels.get_by_id(&created.id).await.unwrap();
    assert_eq!(fetched.location.city, "Mumbai");
    assert_eq!(fetched.location.state, "Maharashtra");
    assert!(fetched.updated_at > created.created_at);
}

#[tokio::test]
async fn two_processes_live_and_on_demand() {
    let store = MemoryStore::new();
    let process_a = hotel_service(&store);
    let process_b = hotel_service(&store);

    process_a.start_live_sync().await.unwrap();
    let mut version = process_a.mirror().watch_version();

    let created = process_b.create(grand_inn()).await.unwrap();

    // B sees its own write without waiting for A.
    assert_eq!(process_b.get_by_id(&created.id).await.unwrap().id, created.id);

    // A's subscription delivers it eventually.
    tokio::time::timeout(Duration::from_secs(5), async {
        while process_a.mirror().get(&created.id).await.is_none() {
            version.changed().await.unwrap();
        }
    })
    .await
    .expect("live subscriber never saw the write");

    assert_eq!(process_b.mode().await, SyncMode::StaleOnDemand);
    assert_eq!(process_a.mode().await, SyncMode::LiveSubscribed);
}

// ── Read-after-write ─────────────────────────────────────────────

#[tokio::test]
async fn create_is_visible_to_forced_reload() {
    let store = MemoryStore::new();
    let hotels = hotel_service(&store);

    let created = hotels.create(grand_inn()).await.unwrap();
    let listed = hotels.list_all(true).await.unwrap();
    assert_eq!(listed, vec![created]);
}

#[tokio::test]
async fn update_is_visible_to_get_by_id() {
    let store = MemoryStore::new();
    let hotels = hotel_service(&store);
    let created = hotels.create(grand_inn()).await.unwrap();

    let updated = hotels
        .update(&created.id, fields(json!({"name": "Grand Inn & Suites"})))
        .await
        .unwrap();

    assert_eq!(updated.name, "Grand Inn & Suites");
    assert_eq!(hotels.get_by_id(&created.id).await.unwrap(), updated);
}

#[tokio::test]
async fn write_reloads_the_whole_collection() {
    let store = MemoryStore::new();
    let hotels = hotel_service(&store);
    hotels.list_all(false).await.unwrap();

    // Written behind the service's back.
    seed(&store, "hotels", "other", json!({"name": "Other", "location": {"city": "Goa"}})).await;
    hotels.create(grand_inn()).await.unwrap();

    let names: Vec<String> = hotels
        .list_all(false)
        .await
        .unwrap()
        .into_iter()
        .map(|h| h.name)
        .collect();
    assert_eq!(names.len(), 2);
    assert!(names.contains(&"Other".to_string()));
}

// ── Point reads ──────────────────────────────────────────────────

#[tokio::test]
async fn cold_cache_miss_falls_back_to_point_read() {
    let store = MemoryStore::new();
    let id = seed(
        &store,
        "hotels",
        "remote-1",
        json!({"name": "Sea Breeze", "location": {"city": "Goa"}}),
    )
    .await;
    let hotels = hotel_service(&store);

    let hotel = hotels.get_by_id(&id).await.unwrap();
    assert_eq!(hotel.name, "Sea Breeze");

    let stats = store.stats();
    assert_eq!(stats.point_reads, 1);
    assert_eq!(stats.queries, 0);
    assert!(!hotels.mirror().is_initialized().await);
    assert!(hotels.mirror().is_empty().await);
}

#[tokio::test]
async fn warm_cache_miss_is_added_to_mirror() {
    let store = MemoryStore::new();
    let hotels = hotel_service(&store);
    hotels.list_all(false).await.unwrap();

    let id = seed(
        &store,
        "hotels",
        "remote-2",
        json!({"name": "Hill View", "location": {"city": "Ooty"}}),
    )
    .await;
    hotels.get_by_id(&id).await.unwrap();

    assert!(hotels.mirror().get(&id).await.is_some());
    store.reset_stats();
    hotels.get_by_id(&id).await.unwrap();
    assert_eq!(store.stats().point_reads, 0);
}

#[tokio::test]
async fn missing_id_is_not_found() {
    let store = MemoryStore::new();
    let hotels = hotel_service(&store);
    let err = hotels.get_by_id(&DocumentId::generate()).await.unwrap_err();
    assert!(err.is_not_found());
}

// ── Listing ──────────────────────────────────────────────────────

#[tokio::test]
async fn warm_list_makes_no_store_calls() {
    let store = MemoryStore::new();
    let hotels = hotel_service(&store);
    hotels.create(grand_inn()).await.unwrap();
    store.reset_stats();

    hotels.list_all(false).await.unwrap();
    hotels.list_active().await.unwrap();
    hotels.search("grand").await.unwrap();

    assert_eq!(store.stats(), StoreStats::default());
}

#[tokio::test]
async fn first_list_loads_lazily() {
    let store = MemoryStore::new();
    seed(&store, "hotels", "h1", json!({"name": "A", "location": {"city": "Pune"}})).await;
    let hotels = hotel_service(&store);
    assert_eq!(hotels.mode().await, SyncMode::Uninitialized);

    assert_eq!(hotels.list_all(false).await.unwrap().len(), 1);
    assert_eq!(store.stats().queries, 1);
    assert_eq!(hotels.mode().await, SyncMode::StaleOnDemand);
}

#[tokio::test]
async fn forced_reload_is_idempotent() {
    let store = MemoryStore::new();
    let hotels = hotel_service(&store);
    hotels.create(grand_inn()).await.unwrap();
    seed(
        &store,
        "hotels",
        "h2",
        json!({
            "name": "B",
            "location": {"city": "Goa"},
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-01-02T00:00:00Z",
        }),
    )
    .await;

    let first = hotels.list_all(true).await.unwrap();
    let second = hotels.list_all(true).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
}

#[tokio::test]
async fn mixed_timestamp_shapes_order_newest_first() {
    let store = MemoryStore::new();
    seed(
        &store,
        "hotels",
        "iso",
        json!({"name": "Iso", "location": {"city": "Pune"}, "createdAt": "2024-01-01T00:00:00Z"}),
    )
    .await;
    seed(
        &store,
        "hotels",
        "epoch",
        json!({"name": "Epoch", "location": {"city": "Pune"}, "createdAt": 1_706_000_000_000_i64}),
    )
    .await;
    seed(
        &store,
        "hotels",
        "marker",
        json!({
            "name": "Marker",
            "location": {"city": "Pune"},
            "createdAt": Timestamp::from_millis(1_710_000_000_000).to_marker(),
        }),
    )
    .await;
    seed(
        &store,
        "hotels",
        "date",
        json!({"name": "Date", "location": {"city": "Pune"}, "createdAt": "2023-06-01"}),
    )
    .await;

    let hotels = hotel_service(&store);
    let ids: Vec<String> = hotels
        .list_all(true)
        .await
        .unwrap()
        .into_iter()
        .map(|h| h.id.to_string())
        .collect();
    assert_eq!(ids, vec!["marker", "epoch", "iso", "date"]);
}

#[tokio::test]
async fn filters_and_search_run_over_the_mirror() {
    let store = MemoryStore::new();
    let hotels = hotel_service(&store);
    hotels.create(grand_inn()).await.unwrap();
    hotels
        .create(fields(json!({
            "name": "Royal Lawns",
            "location": {"city": "Mumbai"},
            "category": "banquet",
            "status": "inactive",
        })))
        .await
        .unwrap();

    let active = hotels.list_active().await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].name, "Grand Inn");

    let banquets = hotels.list_by_category("Banquet").await.unwrap();
    assert_eq!(banquets.len(), 1);
    assert_eq!(banquets[0].name, "Royal Lawns");

    assert_eq!(hotels.search("MUMB").await.unwrap().len(), 1);
    assert_eq!(hotels.search("inn").await.unwrap().len(), 1);
    assert_eq!(hotels.search("   ").await.unwrap().len(), 2);
    assert!(hotels.search("nowhere").await.unwrap().is_empty());
}

#[tokio::test]
async fn users_and_vendors_share_the_same_machinery() {
    let store = MemoryStore::new();
    let users = UserService::new(Arc::new(store.clone()), &CacheConfig::default());
    let vendors = VendorService::new(Arc::new(store.clone()), &CacheConfig::default());

    let user = users
        .create(fields(json!({"name": "Asha", "email": "asha@example.com", "role": "user"})))
        .await
        .unwrap();
    let vendor = vendors
        .create(fields(json!({
            "businessName": "Petal Decor",
            "serviceType": "Decoration",
            "city": "Pune",
        })))
        .await
        .unwrap();

    assert_eq!(users.list_by_category("user").await.unwrap(), vec![user]);
    assert_eq!(vendors.search("petal").await.unwrap(), vec![vendor.clone()]);
    assert_eq!(vendors.list_by_category("decoration").await.unwrap(), vec![vendor]);
    assert_eq!(store.len("users").await, 1);
    assert_eq!(store.len("vendors").await, 1);
}

// ── Deletion ─────────────────────────────────────────────────────

#[tokio::test]
async fn deleted_entity_is_gone() {
    let store = MemoryStore::new();
    let hotels = hotel_service(&store);
    let created = hotels.create(grand_inn()).await.unwrap();

    hotels.delete(&created.id).await.unwrap();

    assert!(hotels.get_by_id(&created.id).await.unwrap_err().is_not_found());
    assert!(hotels.list_all(false).await.unwrap().is_empty());
    assert!(hotels.list_all(true).await.unwrap().is_empty());
}

#[tokio::test]
async fn deleting_missing_entity_is_not_found() {
    let store = MemoryStore::new();
    let hotels = hotel_service(&store);
    let err = hotels.delete(&DocumentId::generate()).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(store.stats().writes, 0);
}

#[tokio::test]
async fn updating_missing_entity_is_not_found() {
    let store = MemoryStore::new();
    let hotels = hotel_service(&store);
    let err = hotels
        .update(&DocumentId::generate(), fields(json!({"name": "X"})))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { .. }));
}

// ── Validation ───────────────────────────────────────────────────

#[tokio::test]
async fn validation_happens_before_any_store_call() {
    let store = MemoryStore::new();
    let hotels = hotel_service(&store);

    let missing_city = fields(json!({"name": "No City"}));
    let err = hotels.create(missing_city).await.unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)), "{err}");

    let mut with_id = grand_inn();
    with_id.insert("id".into(), json!("chosen"));
    assert!(matches!(
        hotels.create(with_id).await,
        Err(ServiceError::Validation(_))
    ));

    let blanking = fields(json!({"name": "  "}));
    assert!(matches!(
        hotels.update(&DocumentId::generate(), blanking).await,
        Err(ServiceError::Validation(_))
    ));

    assert_eq!(store.stats().writes, 0);
}

#[tokio::test]
async fn replacing_location_without_city_is_rejected() {
    let store = MemoryStore::new();
    let hotels = hotel_service(&store);
    let created = hotels.create(grand_inn()).await.unwrap();
    let writes = store.stats().writes;

    for patch in [json!({"location": {"state": "MH"}}), json!({"location": null})] {
        let err = hotels.update(&created.id, fields(patch)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)), "{err}");
    }
    assert_eq!(store.stats().writes, writes);

    // The collection still decodes and a full replacement goes through.
    assert_eq!(hotels.list_all(true).await.unwrap(), vec![created.clone()]);
    let moved = hotels
        .update(
            &created.id,
            fields(json!({"location": {"city": "Mumbai", "state": "MH"}})),
        )
        .await
        .unwrap();
    assert_eq!(moved.location.city, "Mumbai");
    assert_eq!(moved.location.state, "MH");
    assert_eq!(hotels.list_all(true).await.unwrap(), vec![moved]);
}

#[tokio::test]
async fn negative_price_is_rejected() {
    let store = MemoryStore::new();
    let hotels = hotel_service(&store);
    let mut draft = grand_inn();
    draft.insert("pricePerNight".into(), json!(-10));
    assert!(matches!(
        hotels.create(draft).await,
        Err(ServiceError::Validation(_))
    ));
}

// ── Transport failures ───────────────────────────────────────────

#[tokio::test]
async fn transport_failure_surfaces_and_keeps_mirror() {
    let store = MemoryStore::new();
    let hotels = hotel_service(&store);
    let created = hotels.create(grand_inn()).await.unwrap();

    store.set_available(false);
    let err = hotels.list_all(true).await.unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Transport(StoreError::Unavailable(_))
    ));

    // No silent fallback on the forced read, but the warm mirror is intact.
    assert_eq!(hotels.list_all(false).await.unwrap(), vec![created.clone()]);
    assert!(hotels.create(grand_inn()).await.unwrap_err().is_transport());
    assert!(
        hotels
            .get_by_id(&DocumentId::generate())
            .await
            .unwrap_err()
            .is_transport()
    );
}

#[tokio::test]
async fn malformed_document_is_a_transport_failure() {
    let store = MemoryStore::new();
    seed(&store, "hotels", "broken", json!({"name": 42})).await;
    let hotels = hotel_service(&store);

    let err = hotels.list_all(true).await.unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Transport(StoreError::Malformed(_))
    ));
}

// ── Live sync ────────────────────────────────────────────────────

#[tokio::test]
async fn live_sync_lifecycle() {
    let store = MemoryStore::new();
    seed(&store, "hotels", "h1", json!({"name": "A", "location": {"city": "Pune"}})).await;
    let hotels = hotel_service(&store);

    hotels.start_live_sync().await.unwrap();
    assert_eq!(hotels.mode().await, SyncMode::LiveSubscribed);
    assert!(hotels.mirror().is_initialized().await);
    assert_eq!(hotels.mirror().len().await, 1);

    // Starting again is a no-op.
    hotels.start_live_sync().await.unwrap();
    assert_eq!(store.stats().subscriptions, 1);

    hotels.list_all(true).await.unwrap();
    assert_eq!(hotels.mode().await, SyncMode::LiveSubscribed);

    hotels.stop_live_sync().await;
    assert_eq!(hotels.mode().await, SyncMode::StaleOnDemand);
}

#[tokio::test]
async fn live_sync_applies_remote_changes_without_queries() {
    let store = MemoryStore::new();
    let hotels = hotel_service(&store);
    hotels.start_live_sync().await.unwrap();
    let mut version = hotels.mirror().watch_version();
    store.reset_stats();

    let id = seed(&store, "hotels", "pushed", json!({"name": "Pushed", "location": {"city": "Goa"}}))
        .await;
    tokio::time::timeout(Duration::from_secs(5), version.changed())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(hotels.list_all(false).await.unwrap()[0].id, id);
    assert_eq!(store.stats().queries, 0);
}

#[tokio::test]
async fn stopped_live_sync_no_longer_follows_changes() {
    let store = MemoryStore::new();
    let hotels = hotel_service(&store);
    hotels.start_live_sync().await.unwrap();
    hotels.stop_live_sync().await;

    seed(&store, "hotels", "late", json!({"name": "Late", "location": {"city": "Goa"}})).await;
    tokio::task::yield_now().await;

    assert!(hotels.list_all(false).await.unwrap().is_empty());
    assert_eq!(hotels.list_all(true).await.unwrap().len(), 1);
}

#[tokio::test]
async fn live_sync_fails_when_store_is_offline() {
    let store = MemoryStore::new();
    store.set_available(false);
    let hotels = hotel_service(&store);

    assert!(hotels.start_live_sync().await.unwrap_err().is_transport());
    assert_eq!(hotels.mode().await, SyncMode::Uninitialized);
}

// ── Settle strategies ────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn polling_waits_for_commit_time() {
    let store = MemoryStore::with_config(MemoryStoreConfig {
        commit_delay_ms: 200,
    });
    let hotels = hotel_service_with(&store, SettleStrategy::poll(Duration::from_millis(50), 20));

    let created = hotels.create(grand_inn()).await.unwrap();

    let raw = store.get("hotels", &created.id).await.unwrap().unwrap();
    assert!(raw.raw_timestamp("updatedAt").is_resolved());
    assert!(raw.raw_timestamp("createdAt").is_resolved());
    assert_eq!(
        Timestamp::normalize(&raw.raw_timestamp("createdAt")),
        created.created_at
    );
}

#[tokio::test(start_paused = true)]
async fn no_settle_returns_before_commit_time_resolves() {
    let store = MemoryStore::with_config(MemoryStoreConfig {
        commit_delay_ms: 200,
    });
    let hotels = hotel_service_with(&store, SettleStrategy::None);

    let created = hotels.create(grand_inn()).await.unwrap();

    let raw = store.get("hotels", &created.id).await.unwrap().unwrap();
    assert!(!raw.raw_timestamp("createdAt").is_resolved());
    assert_eq!(created.name, "Grand Inn");
}

#[tokio::test(start_paused = true)]
async fn updated_at_never_decreases_while_commit_resolves() {
    let store = MemoryStore::with_config(MemoryStoreConfig {
        commit_delay_ms: 300,
    });
    let hotels = hotel_service_with(&store, SettleStrategy::None);
    let created = hotels.create(grand_inn()).await.unwrap();

    tokio::time::sleep(Duration::from_millis(150)).await;
    let pending = hotels.list_all(true).await.unwrap()[0].updated_at;
    let raw = store.get("hotels", &created.id).await.unwrap().unwrap();
    assert!(!raw.raw_timestamp("updatedAt").is_resolved());

    tokio::time::sleep(Duration::from_millis(400)).await;
    let resolved = hotels.list_all(true).await.unwrap()[0].updated_at;
    let raw = store.get("hotels", &created.id).await.unwrap().unwrap();
    assert!(raw.raw_timestamp("updatedAt").is_resolved());

    assert!(created.updated_at <= pending);
    assert!(pending <= resolved);
    assert_eq!(pending, resolved);
}

#[tokio::test(start_paused = true)]
async fn exhausted_polling_still_completes_the_write() {
    let store = MemoryStore::with_config(MemoryStoreConfig {
        commit_delay_ms: 10_000,
    });
    let hotels = hotel_service_with(&store, SettleStrategy::poll(Duration::from_millis(10), 3));

    let created = hotels.create(grand_inn()).await.unwrap();
    assert_eq!(hotels.get_by_id(&created.id).await.unwrap().id, created.id);
}

#[tokio::test(start_paused = true)]
async fn fixed_delay_settles_short_commit_windows() {
    let store = MemoryStore::with_config(MemoryStoreConfig {
        commit_delay_ms: 100,
    });
    let hotels = hotel_service_with(&store, SettleStrategy::fixed(Duration::from_millis(150)));

    let created = hotels.create(grand_inn()).await.unwrap();
    let raw = store.get("hotels", &created.id).await.unwrap().unwrap();
    assert!(raw.raw_timestamp("updatedAt").is_resolved());
}

#[tokio::test]
async fn collection_names_come_from_the_schema() {
    let store = MemoryStore::new();
    assert_eq!(hotel_service(&store).collection(), Hotel::schema().collection);
    assert_eq!(hotel_service(&store).collection(), "hotels");
}
