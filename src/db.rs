use anyhow::{Context, Result};
use deadpool_postgres::{Config, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime};
use tokio_postgres::NoTls;
use std::time::Duration;

/// The maximum number of pooled connections for the session cache.
const MAX_POOL_SIZE: usize = 32;

/// Creates the connection pool used by the PostgreSQL session store.
///
/// `store_timeout` bounds how long a caller waits for a free connection.
pub fn create_pool(database_url: &str, store_timeout: Duration) -> Result<Pool> {
    let pg_config: tokio_postgres::Config = database_url
        .parse()
        .context("DATABASE_URL is not a valid PostgreSQL connection string")?;

    let mut cfg = Config::new();

    if let Some(tokio_postgres::config::Host::Tcp(hostname)) = pg_config.get_hosts().first() {
        cfg.host = Some(hostname.clone());
    }
    if let Some(port) = pg_config.get_ports().first() {
        cfg.port = Some(*port);
    }
    cfg.dbname = pg_config.get_dbname().map(str::to_string);
    cfg.user = pg_config.get_user().map(str::to_string);
    cfg.password = pg_config
        .get_password()
        .map(|password| String::from_utf8_lossy(password).to_string());

    cfg.manager = Some(ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    });

    cfg.pool = Some(PoolConfig {
        max_size: MAX_POOL_SIZE,
        timeouts: deadpool_postgres::Timeouts {
            wait: Some(store_timeout),
            create: Some(Duration::from_secs(2)),
            recycle: Some(Duration::from_secs(1)),
        },
        ..Default::default()
    });

    let pool = cfg
        .create_pool(Some(Runtime::Tokio1), NoTls)
        .context("Failed to create PostgreSQL pool")?;

    tracing::info!("✅ PostgreSQL Pool initialized (max {} connections)", MAX_POOL_SIZE);
    Ok(pool)
}
