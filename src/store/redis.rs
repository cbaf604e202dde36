use async_trait::async_trait;
use ::redis::{aio::ConnectionManager, AsyncCommands};
use std::time::Duration;

use crate::error::StoreError;
use crate::store::ttl::TtlStore;

/// Largest expiry Redis accepts for `PX`.
const MAX_PX_MILLIS: u64 = i64::MAX as u64;

/// Converts a non-zero TTL into a `PX` argument Redis will accept.
///
/// Sub-millisecond TTLs round up to 1 (`PX 0` is rejected) and oversized
/// ones clamp to [`MAX_PX_MILLIS`].
fn px_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis())
        .unwrap_or(MAX_PX_MILLIS)
        .clamp(1, MAX_PX_MILLIS)
}

/// A TTL store backed by Redis.
///
/// Expiry is delegated to Redis (`PX`), which evicts keys on its own, so
/// no sweep task is needed.
#[derive(Clone)]
pub struct RedisStore {
    redis: ConnectionManager,
}

impl RedisStore {
    /// Opens a pooled connection manager for `redis_url`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Redis`] if the URL is invalid or the server
    /// cannot be reached.
    pub async fn connect(redis_url: &str) -> Result<Self, StoreError> {
        let client = ::redis::Client::open(redis_url)?;
        let redis = ConnectionManager::new(client).await?;
        tracing::info!("✅ Redis Connection Manager initialized (pooled)");
        Ok(Self { redis })
    }

}

#[async_trait]
impl TtlStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let mut conn = self.redis.clone();
        let value: Option<Vec<u8>> = conn.get(key).await?;
        value.ok_or(StoreError::NotFound)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.redis.clone();
        if ttl.is_zero() {
            let _: () = conn.set(key, value).await?;
        } else {
            let _: () = conn.pset_ex(key, value, px_millis(ttl)).await?;
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.redis.clone();
        let _: () = conn.del(key).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn px_millis_stays_within_redis_bounds() {
        assert_eq!(px_millis(Duration::from_micros(10)), 1);
        assert_eq!(px_millis(Duration::from_millis(1500)), 1500);
        assert_eq!(px_millis(Duration::from_secs(u64::MAX / 1000)), MAX_PX_MILLIS);
        assert_eq!(px_millis(Duration::MAX), MAX_PX_MILLIS);
    }
}
