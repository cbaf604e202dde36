use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::error::StoreError;

/// A key/value store where every write may carry an expiry.
///
/// Reads treat expired and absent keys alike: both are
/// [`StoreError::NotFound`].
#[async_trait]
pub trait TtlStore: Send + Sync {
    /// Returns the value for `key` if it exists and has not expired.
    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError>;

    /// Upserts `key`. A zero `ttl` means the entry never expires.
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), StoreError>;

    /// Removes `key`. Missing keys are not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Stops any background work owned by the store.
    async fn shutdown(&self) {}
}

/// Converts a write's `ttl` into an absolute expiry.
///
/// # Returns
///
/// `None` for a zero `ttl` (never expires). A `ttl` past the representable
/// range saturates to the latest timestamp instead.
pub fn expiry_after(ttl: Duration) -> Option<DateTime<Utc>> {
    if ttl.is_zero() {
        return None;
    }

    let expires_at = chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| Utc::now().checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);

    Some(expires_at)
}
