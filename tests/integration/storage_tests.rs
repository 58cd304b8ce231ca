use dealwatch::config::DatabaseConfig;
use dealwatch::models::NewTarget;
use dealwatch::storage::{PriceLedger, SqliteStore, TargetStore};
use dealwatch::utils::error::PersistenceError;
use tokio_test::assert_ok;

fn memory_config() -> DatabaseConfig {
    DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        min_connections: 1,
        acquire_timeout: 5,
    }
}

fn new_target(url: &str, target_price: Option<f64>) -> NewTarget {
    NewTarget {
        owner_id: "+15550100".to_string(),
        url: url.to_string(),
        target_price,
    }
}

#[tokio::test]
async fn test_target_roundtrip_and_uniqueness() {
    let store = assert_ok!(SqliteStore::connect(&memory_config()).await);

    let target = assert_ok!(store.insert_target(new_target("https://example.com/a", None)).await);
    let loaded = store.lookup_target(&target.id).await.unwrap().unwrap();
    assert_eq!(loaded.url, "https://example.com/a");
    assert_eq!(loaded.target_price, None);

    let err = store
        .insert_target(new_target("https://example.com/a", Some(1.0)))
        .await
        .unwrap_err();
    assert!(matches!(err, PersistenceError::Duplicate { .. }));

    assert_eq!(store.list_targets().await.unwrap().len(), 1);
    assert!(store.lookup_target("missing").await.unwrap().is_none());
}

#[tokio::test]
async fn test_initial_threshold_is_conditional() {
    let store = SqliteStore::connect(&memory_config()).await.unwrap();
    let target = store.insert_target(new_target("https://example.com/a", None)).await.unwrap();

    assert!(store.set_initial_threshold(&target.id, 90.0).await.unwrap());
    assert!(!store.set_initial_threshold(&target.id, 10.0).await.unwrap());

    let preset = store
        .insert_target(new_target("https://example.com/b", Some(5.0)))
        .await
        .unwrap();
    assert!(!store.set_initial_threshold(&preset.id, 10.0).await.unwrap());

    let loaded = store.lookup_target(&target.id).await.unwrap().unwrap();
    assert_eq!(loaded.target_price, Some(90.0));
}

#[tokio::test]
async fn test_ledger_latest_and_cascade() {
    let store = SqliteStore::connect(&memory_config()).await.unwrap();
    let target = store.insert_target(new_target("https://example.com/a", None)).await.unwrap();

    assert!(store.latest(&target.id).await.unwrap().is_none());
    store.append(&target.id, 100.0).await.unwrap();
    let second = store.append(&target.id, 85.0).await.unwrap();

    let latest = store.latest(&target.id).await.unwrap().unwrap();
    assert_eq!(latest.id, second.id);
    assert_eq!(latest.price, 85.0);
    assert_eq!(store.history(&target.id, 1).await.unwrap().len(), 1);
    assert_eq!(store.history(&target.id, 10).await.unwrap().len(), 2);

    assert!(store.delete_target(&target.id).await.unwrap());
    assert!(store.history(&target.id, 10).await.unwrap().is_empty());
    assert!(!store.delete_target(&target.id).await.unwrap());
}

#[tokio::test]
async fn test_append_for_unknown_target_is_rejected() {
    let store = SqliteStore::connect(&memory_config()).await.unwrap();
    assert!(store.append("missing", 1.0).await.is_err());
}

#[tokio::test]
async fn test_file_database_survives_reconnect() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("dealwatch.db");
    let config = DatabaseConfig {
        url: format!("sqlite://{}", path.display()),
        max_connections: 2,
        min_connections: 1,
        acquire_timeout: 5,
    };

    let id = {
        let store = SqliteStore::connect(&config).await.unwrap();
        let target = store.insert_target(new_target("https://example.com/a", None)).await.unwrap();
        store.append(&target.id, 12.0).await.unwrap();
        store.pool().close().await;
        target.id
    };

    let store = SqliteStore::connect(&config).await.unwrap();
    assert_eq!(store.latest(&id).await.unwrap().unwrap().price, 12.0);
    assert!(path.exists());
}
