use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use anyhow::{Context, Result};
use zeroize::{Zeroize, Zeroizing};

use crate::services::session::{DEFAULT_SESSION_KIND, DEFAULT_STORE_TIMEOUT, DEFAULT_TOKEN_LIFETIME};
use crate::store::sweep::DEFAULT_SWEEP_INTERVAL;

/// Which TTL store backs the sessions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Redis,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "database" => Ok(Self::Postgres),
            "redis" => Ok(Self::Redis),
            "memory" => Ok(Self::Memory),
            other => anyhow::bail!("Unknown SESSION_STORE '{}' (expected postgres, redis or memory)", other),
        }
    }
}

/// The application's configuration.
#[derive(Clone)]
pub struct Config {
    /// Token secrets in configuration order; the first is active.
    pub cipher_keys: Vec<Zeroizing<Vec<u8>>>,
    /// How long an issued session stays valid.
    pub token_lifetime: Duration,
    /// How often expired cache rows are swept.
    pub sweep_interval: Duration,
    /// Deadline for a single store call.
    pub store_timeout: Duration,
    /// The kind stamped on issued sessions.
    pub session_kind: String,
    /// The TTL store backend.
    pub store: StoreBackend,
    /// The URL of the PostgreSQL database.
    pub database_url: Option<String>,
    /// The URL of the Redis server.
    pub redis_url: String,
    /// The address the HTTP server binds to.
    pub bind_addr: SocketAddr,
}

impl Config {
    /// Creates a new `Config` from environment variables.
    pub fn from_env() -> Result<Self> {
        let mut cipher_keys_hex = env::var("CIPHER_KEYS")
            .context("CIPHER_KEYS must be set (comma-separated hex, generate with: openssl rand -hex 32)")?;
        let cipher_keys = parse_cipher_keys(&cipher_keys_hex);
        cipher_keys_hex.zeroize();
        let cipher_keys = cipher_keys?;

        let store: StoreBackend = env::var("SESSION_STORE")
            .unwrap_or_else(|_| "postgres".to_string())
            .parse()?;

        let database_url = env::var("DATABASE_URL").ok();
        if store == StoreBackend::Postgres && database_url.is_none() {
            anyhow::bail!("DATABASE_URL must be set when SESSION_STORE=postgres");
        }

        Ok(Self {
            cipher_keys,
            token_lifetime: duration_var("TOKEN_LIFETIME_MINUTES", |m| Duration::from_secs(m.saturating_mul(60)), DEFAULT_TOKEN_LIFETIME)?,
            sweep_interval: duration_var("SWEEP_INTERVAL_SECS", Duration::from_secs, DEFAULT_SWEEP_INTERVAL)?,
            store_timeout: duration_var("STORE_TIMEOUT_MS", Duration::from_millis, DEFAULT_STORE_TIMEOUT)?,
            session_kind: env::var("SESSION_KIND")
                .unwrap_or_else(|_| DEFAULT_SESSION_KIND.to_string()),
            store,
            database_url,
            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
            bind_addr: env::var("BIND_ADDR")
                .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
                .parse()
                .context("Invalid BIND_ADDR")?,
        })
    }
}

/// Decodes a comma-separated list of hex secrets, preserving order.
pub fn parse_cipher_keys(raw: &str) -> Result<Vec<Zeroizing<Vec<u8>>>> {
    let keys = raw
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .enumerate()
        .map(|(i, part)| {
            let bytes = hex::decode(part)
                .with_context(|| format!("CIPHER_KEYS entry #{} must be valid hexadecimal", i))?;
            if !matches!(bytes.len(), 16 | 24 | 32) {
                anyhow::bail!(
                    "CIPHER_KEYS entry #{} must be 16, 24 or 32 bytes, got {}",
                    i,
                    bytes.len()
                );
            }
            Ok(Zeroizing::new(bytes))
        })
        .collect::<Result<Vec<_>>>()?;

    if keys.is_empty() {
        anyhow::bail!("CIPHER_KEYS must contain at least one key");
    }

    Ok(keys)
}

/// Reads an integer duration variable, falling back to `default` when unset or zero.
fn duration_var(name: &str, to_duration: fn(u64) -> Duration, default: Duration) -> Result<Duration> {
    let Ok(raw) = env::var(name) else {
        return Ok(default);
    };

    let value: u64 = raw
        .trim()
        .parse()
        .with_context(|| format!("Invalid {}", name))?;

    match to_duration(value) {
        d if d.is_zero() => Ok(default),
        d => Ok(d),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ordered_hex_keys() {
        let raw = format!("{}, {}", "11".repeat(32), "22".repeat(16));
        let keys = parse_cipher_keys(&raw).unwrap();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0].len(), 32);
        assert_eq!(keys[1][..], [0x22u8; 16]);
    }

    #[test]
    fn rejects_empty_and_bad_keys() {
        assert!(parse_cipher_keys("").is_err());
        assert!(parse_cipher_keys(" , ").is_err());
        assert!(parse_cipher_keys("zz").is_err());
        assert!(parse_cipher_keys(&"ab".repeat(20)).is_err());
    }

    #[test]
    fn store_backend_names() {
        assert_eq!("postgres".parse::<StoreBackend>().unwrap(), StoreBackend::Postgres);
        assert_eq!("Redis".parse::<StoreBackend>().unwrap(), StoreBackend::Redis);
        assert_eq!("memory".parse::<StoreBackend>().unwrap(), StoreBackend::Memory);
        assert!("sqlite".parse::<StoreBackend>().is_err());
    }
}
