use async_trait::async_trait;
use chrono::Utc;
use deadpool_postgres::Pool;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::StoreError;
use crate::store::sweep::{Sweep, SweepHandle};
use crate::store::ttl::{expiry_after, TtlStore};

/// The number of expired rows deleted per statement during a sweep.
const SWEEP_BATCH_SIZE: i64 = 500;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS caches (
        id UUID PRIMARY KEY,
        key TEXT NOT NULL UNIQUE,
        value BYTEA NOT NULL,
        expires_at TIMESTAMPTZ
    );
    CREATE INDEX IF NOT EXISTS caches_key_expires_at_idx ON caches (key, expires_at);
    CREATE INDEX IF NOT EXISTS caches_expires_at_idx ON caches (expires_at);
"#;

const QUERY_GET: &str = r#"
    SELECT value
    FROM caches
    WHERE key = $1 AND (expires_at IS NULL OR expires_at > $2)
"#;

const QUERY_SET: &str = r#"
    INSERT INTO caches (id, key, value, expires_at)
    VALUES ($1, $2, $3, $4)
    ON CONFLICT (key) DO UPDATE
    SET value = EXCLUDED.value, expires_at = EXCLUDED.expires_at
"#;

const QUERY_DELETE: &str = "DELETE FROM caches WHERE key = $1";

const QUERY_SWEEP: &str = r#"
    DELETE FROM caches
    WHERE id IN (
        SELECT id
        FROM caches
        WHERE expires_at IS NOT NULL AND expires_at <= $1
        LIMIT $2
    )
"#;

/// The `caches` table reached through a connection pool.
pub struct PostgresTable {
    pool: Pool,
}

impl PostgresTable {
    /// Creates the table and indexes if they are missing.
    async fn boot(&self) -> Result<(), StoreError> {
        let client = self.pool.get().await?;
        client.batch_execute(SCHEMA).await?;
        Ok(())
    }
}

#[async_trait]
impl Sweep for PostgresTable {
    async fn sweep_expired(&self) -> Result<u64, StoreError> {
        let client = self.pool.get().await?;
        let statement = client.prepare_cached(QUERY_SWEEP).await?;
        let now = Utc::now();

        let mut removed = 0;
        loop {
            let deleted = client
                .execute(&statement, &[&now, &SWEEP_BATCH_SIZE])
                .await?;
            removed += deleted;

            if deleted < SWEEP_BATCH_SIZE as u64 {
                break;
            }
        }

        Ok(removed)
    }
}

/// A TTL store backed by PostgreSQL.
pub struct PostgresStore {
    table: Arc<PostgresTable>,
    sweeper: Mutex<Option<SweepHandle>>,
}

impl PostgresStore {
    /// Boots the schema and starts the sweep task.
    pub async fn connect(pool: Pool, sweep_interval: Duration) -> Result<Self, StoreError> {
        let table = Arc::new(PostgresTable { pool });
        table.boot().await?;
        tracing::info!("✅ Cache table ready");

        let sweeper = SweepHandle::spawn(table.clone(), sweep_interval);
        tracing::info!(
            "✅ Cache sweeper started (every {}s)",
            sweep_interval.as_secs()
        );

        Ok(Self {
            table,
            sweeper: Mutex::new(Some(sweeper)),
        })
    }

    /// Runs one sweep pass immediately.
    pub async fn sweep_expired(&self) -> Result<u64, StoreError> {
        self.table.sweep_expired().await
    }
}

#[async_trait]
impl TtlStore for PostgresStore {
    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let client = self.table.pool.get().await?;
        let statement = client.prepare_cached(QUERY_GET).await?;

        let row = client
            .query_opt(&statement, &[&key, &Utc::now()])
            .await?
            .ok_or(StoreError::NotFound)?;

        Ok(row.try_get("value")?)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), StoreError> {
        let expires_at = expiry_after(ttl);

        let client = self.table.pool.get().await?;
        let statement = client.prepare_cached(QUERY_SET).await?;
        client
            .execute(&statement, &[&Uuid::now_v7(), &key, &value, &expires_at])
            .await?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let client = self.table.pool.get().await?;
        let statement = client.prepare_cached(QUERY_DELETE).await?;
        client.execute(&statement, &[&key]).await?;
        Ok(())
    }

    async fn shutdown(&self) {
        if let Some(sweeper) = self.sweeper.lock().await.take() {
            sweeper.shutdown().await;
        }
    }
}
