use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};

use crate::error::StoreError;
use crate::store::sweep::{Sweep, SweepHandle};
use crate::store::ttl::{expiry_after, TtlStore};

/// A cached value and its absolute expiry.
#[derive(Clone)]
struct Entry {
    value: Vec<u8>,
    expires_at: Option<DateTime<Utc>>,
}

impl Entry {
    fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

/// The shared map behind a [`MemoryStore`].
#[derive(Default)]
pub struct MemoryTable {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryTable {
    /// Keys whose entries are expired at `now`.
    async fn expired_keys(&self, now: DateTime<Utc>) -> Vec<String> {
        let entries = self.entries.read().await;
        entries
            .iter()
            .filter(|(_, entry)| !entry.is_live_at(now))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Removes each of `keys` that is still expired at `now`.
    async fn remove_expired(&self, keys: Vec<String>, now: DateTime<Utc>) -> u64 {
        let mut removed = 0;
        for key in keys {
            let mut entries = self.entries.write().await;
            // a concurrent set may have refreshed the key since the scan
            if entries.get(&key).is_some_and(|entry| !entry.is_live_at(now)) {
                entries.remove(&key);
                removed += 1;
            }
        }
        removed
    }
}

#[async_trait]
impl Sweep for MemoryTable {
    async fn sweep_expired(&self) -> Result<u64, StoreError> {
        let now = Utc::now();
        let expired = self.expired_keys(now).await;
        Ok(self.remove_expired(expired, now).await)
    }
}

/// An in-process TTL store.
///
/// Used for tests and single-node deployments; entries do not survive a
/// restart.
pub struct MemoryStore {
    table: Arc<MemoryTable>,
    sweeper: Mutex<Option<SweepHandle>>,
}

impl MemoryStore {
    /// Creates a store and starts its sweep task.
    ///
    /// # Arguments
    ///
    /// * `sweep_interval` - Time between sweeps; zero uses the default interval.
    pub fn new(sweep_interval: Duration) -> Self {
        let table = Arc::new(MemoryTable::default());
        let sweeper = SweepHandle::spawn(table.clone(), sweep_interval);
        tracing::info!("✅ In-memory session store initialized");

        Self {
            table,
            sweeper: Mutex::new(Some(sweeper)),
        }
    }

    /// Runs one sweep pass immediately.
    pub async fn sweep_expired(&self) -> Result<u64, StoreError> {
        self.table.sweep_expired().await
    }

    /// Number of stored entries, expired ones included.
    pub async fn len(&self) -> usize {
        self.table.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl TtlStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let entries = self.table.entries.read().await;
        match entries.get(key) {
            Some(entry) if entry.is_live_at(Utc::now()) => Ok(entry.value.clone()),
            _ => Err(StoreError::NotFound),
        }
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), StoreError> {
        let entry = Entry {
            value: value.to_vec(),
            expires_at: expiry_after(ttl),
        };

        self.table.entries.write().await.insert(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.table.entries.write().await.remove(key);
        Ok(())
    }

    async fn shutdown(&self) {
        if let Some(sweeper) = self.sweeper.lock().await.take() {
            sweeper.shutdown().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MemoryStore {
        MemoryStore::new(Duration::from_secs(3600))
    }

    #[tokio::test]
    async fn get_returns_existing_value() {
        let store = store();
        store.set("foo", b"bar", Duration::from_secs(60)).await.unwrap();
        assert_eq!(store.get("foo").await.unwrap(), b"bar");
    }

    #[tokio::test]
    async fn missing_key_is_not_found() {
        let store = store();
        assert!(matches!(store.get("foo").await, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn expired_key_is_not_found_before_any_sweep() {
        let store = store();
        store.set("foo", b"bar", Duration::from_millis(10)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(matches!(store.get("foo").await, Err(StoreError::NotFound)));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn zero_ttl_never_expires() {
        let store = store();
        store.set("forever", b"v", Duration::ZERO).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(store.get("forever").await.unwrap(), b"v");
    }

    #[tokio::test]
    async fn set_overwrites_value_and_expiry() {
        let store = store();
        store.set("foo", b"buzz", Duration::from_millis(10)).await.unwrap();
        store.set("foo", b"bar", Duration::from_secs(60)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(store.get("foo").await.unwrap(), b"bar");
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = store();
        store.set("foo", b"bar", Duration::from_secs(60)).await.unwrap();
        store.delete("foo").await.unwrap();
        store.delete("foo").await.unwrap();
        assert!(matches!(store.get("foo").await, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn sweep_removes_only_expired_entries() {
        let store = store();
        store.set("live", b"1", Duration::from_secs(60)).await.unwrap();
        store.set("forever", b"2", Duration::ZERO).await.unwrap();
        store.set("stale", b"3", Duration::from_millis(5)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(15)).await;

        assert_eq!(store.sweep_expired().await.unwrap(), 1);
        assert_eq!(store.len().await, 2);
        assert_eq!(store.get("live").await.unwrap(), b"1");
        assert_eq!(store.get("forever").await.unwrap(), b"2");
        assert!(matches!(store.get("stale").await, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn background_sweep_evicts_expired_entries() {
        let store = MemoryStore::new(Duration::from_millis(10));
        store.set("stale", b"x", Duration::from_millis(5)).await.unwrap();
        store.set("live", b"y", Duration::from_secs(60)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;

        assert_eq!(store.len().await, 1);
        assert_eq!(store.get("live").await.unwrap(), b"y");
        store.shutdown().await;
    }

    #[tokio::test]
    async fn concurrent_sets_leave_one_whole_value() {
        let store = Arc::new(store());
        let mut tasks = Vec::new();
        for i in 0..16u8 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                store.set("race", &[i; 64], Duration::from_secs(60)).await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let value = store.get("race").await.unwrap();
        assert_eq!(value.len(), 64);
        assert!(value.iter().all(|b| *b == value[0]));
    }

    #[tokio::test]
    async fn sweep_spares_a_key_refreshed_after_the_scan() {
        let store = store();
        store.set("foo", b"old", Duration::from_millis(5)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(15)).await;

        let now = Utc::now();
        let expired = store.table.expired_keys(now).await;
        assert_eq!(expired, vec!["foo".to_string()]);

        store.set("foo", b"new", Duration::from_secs(60)).await.unwrap();

        assert_eq!(store.table.remove_expired(expired, now).await, 0);
        assert_eq!(store.get("foo").await.unwrap(), b"new");
    }

    #[tokio::test]
    async fn zero_sweep_interval_still_serves_and_shuts_down() {
        let store = MemoryStore::new(Duration::ZERO);
        store.set("foo", b"bar", Duration::from_secs(60)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(store.get("foo").await.unwrap(), b"bar");
        assert!(store
            .sweeper
            .lock()
            .await
            .as_ref()
            .is_some_and(|sweeper| sweeper.is_running()));
        store.shutdown().await;
    }

    #[tokio::test]
    async fn huge_ttl_is_kept_not_dropped() {
        let store = store();
        store.set("foo", b"bar", Duration::MAX).await.unwrap();
        assert_eq!(store.get("foo").await.unwrap(), b"bar");
        assert_eq!(store.sweep_expired().await.unwrap(), 0);
        assert_eq!(store.len().await, 1);
    }
}
