//! Redis cache backend
//!
//! Network-backed implementation of the [`RateCache`] contract. TTLs map
//! directly onto redis key expiry; the full rate table is stored as one
//! JSON blob under the sentinel key, same as the in-process backend.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;

use super::cache::{CacheError, RateCache};

/// External cache backend over a shared redis connection.
#[derive(Clone)]
pub struct RedisRateCache {
    conn: ConnectionManager,
}

impl RedisRateCache {
    /// Connect and verify the server responds before first use.
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(url)?;
        let mut conn = ConnectionManager::new(client).await?;

        let _: String = redis::cmd("PING").query_async(&mut conn).await?;

        tracing::info!(url = %url, "redis rate cache initialized");
        Ok(Self { conn })
    }
}

#[async_trait]
impl RateCache for RedisRateCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        // Redis expiry has one-second granularity; never round down to 0.
        let seconds = ttl.as_secs().max(1);
        let _: () = conn.set_ex(key, value, seconds).await?;
        Ok(())
    }
}
