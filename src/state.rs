use std::sync::Arc;
use anyhow::Context;

use crate::config::{Config, StoreBackend};
use crate::crypto::keyring::Keyring;
use crate::middleware_layer::auth::SessionGuard;
use crate::services::session::{SessionConfig, SessionManager};
use crate::store::{memory::MemoryStore, postgres::PostgresStore, redis::RedisStore, ttl::TtlStore};

/// The application's state.
#[derive(Clone)]
pub struct AppState {
    /// The session manager.
    pub sessions: Arc<SessionManager>,
    /// The guard protecting session routes.
    pub guard: SessionGuard,
    /// The TTL store behind the sessions.
    pub store: Arc<dyn TtlStore>,
}

impl AppState {
    /// Builds the store selected in `config` and the session stack on top of it.
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        let store: Arc<dyn TtlStore> = match config.store {
            StoreBackend::Postgres => {
                let database_url = config
                    .database_url
                    .as_deref()
                    .context("DATABASE_URL must be set")?;
                let pool = crate::db::create_pool(database_url, config.store_timeout)?;
                Arc::new(PostgresStore::connect(pool, config.sweep_interval).await?)
            }
            StoreBackend::Redis => Arc::new(RedisStore::connect(&config.redis_url).await?),
            StoreBackend::Memory => Arc::new(MemoryStore::new(config.sweep_interval)),
        };

        let keyring = Keyring::new(config.cipher_keys.iter().map(|key| key.as_slice()))?;
        let session_config = SessionConfig::default()
            .with_token_lifetime(config.token_lifetime)
            .with_store_timeout(config.store_timeout)
            .with_default_kind(config.session_kind.clone());

        Ok(Self::from_parts(keyring, store, session_config))
    }

    /// Assembles the state around an existing store.
    pub fn from_parts(keyring: Keyring, store: Arc<dyn TtlStore>, config: SessionConfig) -> Self {
        let sessions = Arc::new(SessionManager::new(keyring, store.clone(), config));
        let guard = SessionGuard::new(sessions.clone());

        Self {
            sessions,
            guard,
            store,
        }
    }
}
