//! Backend tests against live servers.
//!
//! Run with `DATABASE_URL=... REDIS_URL=... cargo test -- --ignored`.

use std::time::Duration;

use tokenvault::{
    store::{postgres::PostgresStore, redis::RedisStore},
    StoreError, TtlStore,
};

fn unique_key(prefix: &str) -> String {
    format!("{}:{}", prefix, uuid::Uuid::new_v4())
}

async fn exercise(store: &dyn TtlStore, prefix: &str) {
    let key = unique_key(prefix);

    assert!(matches!(store.get(&key).await, Err(StoreError::NotFound)));

    store.set(&key, b"buzz", Duration::from_secs(60)).await.unwrap();
    store.set(&key, b"bar", Duration::from_secs(60)).await.unwrap();
    assert_eq!(store.get(&key).await.unwrap(), b"bar");

    store.delete(&key).await.unwrap();
    store.delete(&key).await.unwrap();
    assert!(matches!(store.get(&key).await, Err(StoreError::NotFound)));

    let short = unique_key(prefix);
    store.set(&short, b"x", Duration::from_millis(100)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert!(matches!(store.get(&short).await, Err(StoreError::NotFound)));

    let forever = unique_key(prefix);
    store.set(&forever, b"y", Duration::ZERO).await.unwrap();
    assert_eq!(store.get(&forever).await.unwrap(), b"y");
    store.delete(&forever).await.unwrap();
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn postgres_store_contract_and_sweep() {
    let url = std::env::var("DATABASE_URL").unwrap();
    let pool = tokenvault::db::create_pool(&url, Duration::from_secs(5)).unwrap();
    let store = PostgresStore::connect(pool.clone(), Duration::from_secs(3600)).await.unwrap();
    // schema boot is idempotent
    let again = PostgresStore::connect(pool, Duration::from_secs(3600)).await.unwrap();
    again.shutdown().await;

    exercise(&store, "test-pg").await;

    let live = unique_key("test-pg");
    let stale = unique_key("test-pg");
    store.set(&live, b"1", Duration::from_secs(60)).await.unwrap();
    store.set(&stale, b"2", Duration::from_millis(10)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(store.sweep_expired().await.unwrap() >= 1);
    assert_eq!(store.get(&live).await.unwrap(), b"1");

    store.delete(&live).await.unwrap();
    store.shutdown().await;
}

#[tokio::test]
#[ignore = "requires REDIS_URL"]
async fn redis_store_contract() {
    let url = std::env::var("REDIS_URL").unwrap();
    let store = RedisStore::connect(&url).await.unwrap();
    exercise(&store, "test-redis").await;
}
