use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

use crate::crypto::codec::SessionCodec;
use crate::crypto::keyring::Keyring;
use crate::error::{Result, SessionError, StoreError};
use crate::models::session::SessionRecord;
use crate::store::ttl::TtlStore;

/// The default lifetime of an issued session.
pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(60 * 60);
/// The default deadline for a single store call.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);
/// The kind used by [`SessionManager::issue`].
pub const DEFAULT_SESSION_KIND: &str = "user";

/// Tunables for a [`SessionManager`].
#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub token_lifetime: Duration,
    pub store_timeout: Duration,
    pub default_kind: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            token_lifetime: DEFAULT_TOKEN_LIFETIME,
            store_timeout: DEFAULT_STORE_TIMEOUT,
            default_kind: DEFAULT_SESSION_KIND.to_string(),
        }
    }
}

impl SessionConfig {
    /// Sets how long issued sessions stay valid.
    pub fn with_token_lifetime(mut self, token_lifetime: Duration) -> Self {
        self.token_lifetime = token_lifetime;
        self
    }

    /// Sets the deadline for each store call.
    pub fn with_store_timeout(mut self, store_timeout: Duration) -> Self {
        self.store_timeout = store_timeout;
        self
    }

    /// Sets the kind used by [`SessionManager::issue`].
    pub fn with_default_kind(mut self, kind: impl Into<String>) -> Self {
        self.default_kind = kind.into();
        self
    }
}

/// Issues, validates and revokes bearer sessions.
pub struct SessionManager {
    codec: SessionCodec,
    store: Arc<dyn TtlStore>,
    config: SessionConfig,
}

impl SessionManager {
    /// Creates a manager; a zero lifetime or timeout falls back to the default.
    ///
    /// # Arguments
    ///
    /// * `keyring` - The keys tokens are sealed and opened with.
    /// * `store` - Where session records live.
    /// * `config` - Lifetimes, deadlines and the default kind.
    pub fn new(keyring: Keyring, store: Arc<dyn TtlStore>, mut config: SessionConfig) -> Self {
        if config.token_lifetime.is_zero() {
            config.token_lifetime = DEFAULT_TOKEN_LIFETIME;
        }
        if config.store_timeout.is_zero() {
            config.store_timeout = DEFAULT_STORE_TIMEOUT;
        }

        Self {
            codec: SessionCodec::new(keyring),
            store,
            config,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Issues a token for `subject_id` with the default session kind.
    pub async fn issue(&self, subject_id: &str) -> Result<String> {
        self.issue_for(&self.config.default_kind, subject_id).await
    }

    /// Issues a token for `subject_id` as a session of `kind`.
    ///
    /// No token is returned unless the record was stored.
    pub async fn issue_for(&self, kind: &str, subject_id: &str) -> Result<String> {
        let lifetime = self.config.token_lifetime;
        let expires_at = chrono::Duration::from_std(lifetime)
            .ok()
            .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
            .ok_or_else(|| {
                SessionError::Configuration("token lifetime is out of range".to_string())
            })?;

        let record = SessionRecord::new(subject_id, kind, expires_at);
        let contents = self.codec.encode_record(&record)?;
        let lookup_key = self.codec.new_lookup_key(kind, subject_id);
        let token = self.codec.seal(&lookup_key)?;

        self.bounded(self.store.set(&lookup_key, &contents, lifetime))
            .await
            .map_err(|e| {
                tracing::error!("❌ Failed to store session {}: {}", lookup_key, e);
                SessionError::Store(e)
            })?;

        tracing::debug!("✅ Session issued for {} {}", kind, subject_id);
        Ok(token)
    }

    /// Resolves a token to its live session.
    ///
    /// Every failure is [`SessionError::Unauthenticated`] except a record
    /// whose own expiry has passed, which is [`SessionError::Expired`].
    pub async fn validate(&self, token: &str) -> Result<SessionRecord> {
        let opened = self.codec.open(token).map_err(|_| {
            tracing::debug!("❌ Token could not be opened");
            SessionError::Unauthenticated
        })?;
        let key = opened.lookup_key;

        let contents = match self.bounded(self.store.get(&key)).await {
            Ok(contents) => contents,
            Err(StoreError::NotFound) => {
                tracing::debug!("❌ Session not found: {}", key);
                return Err(SessionError::Unauthenticated);
            }
            Err(e) => {
                tracing::error!("❌ Session store unavailable while reading {}: {}", key, e);
                return Err(SessionError::Unauthenticated);
            }
        };

        let record = self.codec.decode_record(&contents).map_err(|e| {
            tracing::warn!("❌ Malformed session record {}: {}", key, e);
            SessionError::Unauthenticated
        })?;

        if record.is_expired() {
            tracing::warn!("❌ Session expired for {} {}", record.kind, record.subject_id);
            self.evict_in_background(key);
            return Err(SessionError::Expired);
        }

        Ok(record)
    }

    /// Revokes a token. Tokens that cannot be opened are already invalid,
    /// so revoking them succeeds.
    pub async fn revoke(&self, token: &str) -> Result<()> {
        let Ok(opened) = self.codec.open(token) else {
            tracing::debug!("Revoke of unreadable token ignored");
            return Ok(());
        };

        self.bounded(self.store.delete(&opened.lookup_key))
            .await
            .map_err(|e| {
                tracing::error!("❌ Failed to revoke session {}: {}", opened.lookup_key, e);
                SessionError::Store(e)
            })?;

        tracing::debug!("✅ Session revoked: {}", opened.lookup_key);
        Ok(())
    }

    /// Re-seals a valid token under the active key.
    ///
    /// Returns `Some(new_token)` when `token` was sealed with a legacy key
    /// and `None` when it is already current. The new token points at the
    /// same session, so both stay valid until it ends.
    pub async fn reseal(&self, token: &str) -> Result<Option<String>> {
        self.validate(token).await?;

        let opened = self
            .codec
            .open(token)
            .map_err(|_| SessionError::Unauthenticated)?;
        if !opened.is_legacy() {
            return Ok(None);
        }

        tracing::info!("🔑 Migrating session {} to the active key", opened.lookup_key);
        self.codec.seal(&opened.lookup_key).map(Some)
    }

    /// Deletes a stale entry without holding up the caller.
    fn evict_in_background(&self, key: String) {
        let store = self.store.clone();
        let timeout = self.config.store_timeout;

        tokio::spawn(async move {
            match tokio::time::timeout(timeout, store.delete(&key)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::warn!("⚠️  Unable to delete expired session {}: {}", key, e);
                }
                Err(_) => {
                    tracing::warn!("⚠️  Timed out deleting expired session {}", key);
                }
            }
        });
    }

    async fn bounded<T>(
        &self,
        op: impl Future<Output = std::result::Result<T, StoreError>>,
    ) -> std::result::Result<T, StoreError> {
        tokio::time::timeout(self.config.store_timeout, op)
            .await
            .map_err(|_| StoreError::Timeout)?
    }
}
