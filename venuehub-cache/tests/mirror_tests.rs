use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use venuehub_cache::Mirror;
use venuehub_model::{Document, Hotel, decode};
use venuehub_types::{DocumentId, Timestamp};

fn hotel(id: &str, name: &str, created_ms: i64) -> Hotel {
    let fields = json!({
        "name": name,
        "location": {"city": "Pune"},
        "createdAt": created_ms,
        "updatedAt": created_ms,
    });
    let doc = Document::new(
        DocumentId::parse(id).unwrap(),
        fields.as_object().cloned().unwrap(),
    );
    decode(&doc).unwrap()
}

fn ids(entities: &[Hotel]) -> Vec<&str> {
    entities.iter().map(|h| h.id.as_str()).collect()
}

// ── Construction ─────────────────────────────────────────────────

#[tokio::test]
async fn new_mirror_is_empty_and_uninitialized() {
    let mirror: Mirror<Hotel> = Mirror::new();
    assert!(!mirror.is_initialized().await);
    assert!(mirror.is_empty().await);
    assert_eq!(mirror.version(), 0);
}

// ── replace_all ──────────────────────────────────────────────────

#[tokio::test]
async fn replace_all_sorts_newest_first_and_initializes() {
    let mirror = Mirror::new();
    mirror
        .replace_all(vec![
            hotel("a", "A", 1_000),
            hotel("b", "B", 3_000),
            hotel("c", "C", 2_000),
        ])
        .await;

    assert!(mirror.is_initialized().await);
    assert_eq!(ids(&mirror.snapshot().await), vec!["b", "c", "a"]);
}

#[tokio::test]
async fn equal_timestamps_order_by_id() {
    let mirror = Mirror::new();
    mirror
        .replace_all(vec![hotel("z", "Z", 5), hotel("m", "M", 5), hotel("a", "A", 5)])
        .await;
    assert_eq!(ids(&mirror.snapshot().await), vec!["a", "m", "z"]);
}

#[tokio::test]
async fn held_snapshot_is_unaffected_by_swap() {
    let mirror = Mirror::new();
    mirror.replace_all(vec![hotel("a", "A", 1)]).await;
    let before = mirror.snapshot().await;

    mirror.replace_all(vec![hotel("b", "B", 2), hotel("c", "C", 3)]).await;

    assert_eq!(ids(&before), vec!["a"]);
    assert_eq!(ids(&mirror.snapshot().await), vec!["c", "b"]);
}

#[tokio::test]
async fn concurrent_readers_see_whole_snapshots() {
    let mirror = Arc::new(Mirror::new());
    let old: Vec<Hotel> = (0..50).map(|i| hotel(&format!("old-{i}"), "Old", i)).collect();
    let new: Vec<Hotel> = (0..50).map(|i| hotel(&format!("new-{i}"), "New", i)).collect();
    mirror.replace_all(old).await;

    let writer = {
        let mirror = Arc::clone(&mirror);
        tokio::spawn(async move { mirror.replace_all(new).await })
    };
    for _ in 0..20 {
        let snapshot = mirror.snapshot().await;
        let olds = snapshot.iter().filter(|h| h.name == "Old").count();
        assert!(olds == 0 || olds == snapshot.len(), "mixed snapshot");
        tokio::task::yield_now().await;
    }
    writer.await.unwrap();
}

// ── Local edits ──────────────────────────────────────────────────

#[tokio::test]
async fn get_finds_by_id() {
    let mirror = Mirror::new();
    mirror.replace_all(vec![hotel("a", "A", 1), hotel("b", "B", 2)]).await;

    let found = mirror.get(&DocumentId::parse("b").unwrap()).await.unwrap();
    assert_eq!(found.name, "B");
    assert!(mirror.get(&DocumentId::parse("x").unwrap()).await.is_none());
}

#[tokio::test]
async fn upsert_replaces_in_place_or_inserts_sorted() {
    let mirror = Mirror::new();
    mirror.replace_all(vec![hotel("a", "A", 1), hotel("b", "B", 3)]).await;

    mirror.upsert_one(hotel("a", "A renamed", 1)).await;
    mirror.upsert_one(hotel("c", "C", 2)).await;

    let snapshot = mirror.snapshot().await;
    assert_eq!(ids(&snapshot), vec!["b", "c", "a"]);
    assert_eq!(snapshot[2].name, "A renamed");
}

#[tokio::test]
async fn upsert_does_not_initialize() {
    let mirror = Mirror::new();
    mirror.upsert_one(hotel("a", "A", 1)).await;
    assert!(!mirror.is_initialized().await);
    assert_eq!(mirror.len().await, 1);
}

#[tokio::test]
async fn remove_one_reports_presence() {
    let mirror = Mirror::new();
    mirror.replace_all(vec![hotel("a", "A", 1)]).await;

    let id = DocumentId::parse("a").unwrap();
    assert!(mirror.remove_one(&id).await);
    assert!(!mirror.remove_one(&id).await);
    assert!(mirror.is_empty().await);
}

#[tokio::test]
async fn invalidate_keeps_contents() {
    let mirror = Mirror::new();
    mirror.replace_all(vec![hotel("a", "A", 1)]).await;
    mirror.invalidate().await;

    assert!(!mirror.is_initialized().await);
    assert_eq!(mirror.len().await, 1);
}

// ── Versions ─────────────────────────────────────────────────────

#[tokio::test]
async fn every_swap_bumps_version() {
    let mirror = Mirror::new();
    let mut watcher = mirror.watch_version();

    mirror.replace_all(vec![hotel("a", "A", 1)]).await;
    mirror.upsert_one(hotel("b", "B", 2)).await;
    mirror.remove_one(&DocumentId::parse("a").unwrap()).await;

    assert_eq!(mirror.version(), 3);
    watcher.changed().await.unwrap();
    assert_eq!(*watcher.borrow_and_update(), 3);
}

#[tokio::test]
async fn timestamps_are_canonical() {
    let mirror = Mirror::new();
    mirror.replace_all(vec![hotel("a", "A", 1_700_000_000_000)]).await;
    let snapshot = mirror.snapshot().await;
    assert_eq!(snapshot[0].created_at, Timestamp::from_millis(1_700_000_000_000));
}
