//! Rate cache contract and in-process backend
//!
//! The cache is a pure performance layer in front of the rate source,
//! never a correctness dependency: every caller must keep working (slower)
//! with the cache entirely absent or failing. Expiration is evaluated
//! lazily at read time; an expired entry behaves as a miss.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// Sentinel key under which the full rate table is stored.
pub const RATES_CACHE_KEY: &str = "exchange:rates";

/// Errors reported by cache backends. Callers treat any of these as a
/// cache miss; they are logged and never surfaced past the resolver.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache backend error: {0}")]
    Backend(String),

    #[error("Cache encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        CacheError::Backend(err.to_string())
    }
}

/// Key/value store with per-entry time-to-live.
///
/// Both backends (in-process map, external redis) satisfy this identical
/// contract so the rate resolver stays backend-agnostic; the backend is
/// selected once at startup from configuration.
#[async_trait]
pub trait RateCache: Send + Sync {
    /// Look up a single entry. `Ok(None)` covers both absent and expired.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store a single entry, overwriting any previous value.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    /// Look up the full rate table stored under [`RATES_CACHE_KEY`].
    async fn get_rates(&self) -> Result<Option<HashMap<String, String>>, CacheError> {
        match self.get(RATES_CACHE_KEY).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Store the full rate table under [`RATES_CACHE_KEY`].
    async fn set_rates(
        &self,
        rates: &HashMap<String, String>,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let raw = serde_json::to_string(rates)?;
        self.set(RATES_CACHE_KEY, &raw, ttl).await
    }
}

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

/// In-process cache backend guarded by a read/write mutex.
///
/// Expired entries are not evicted eagerly; they are overwritten by the
/// next successful refresh of the same key.
#[derive(Debug, Default)]
pub struct MemoryRateCache {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryRateCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RateCache for MemoryRateCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| CacheError::Backend("cache lock poisoned".to_string()))?;

        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.value.clone())),
            _ => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| CacheError::Backend("cache lock poisoned".to_string()))?;

        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }
}
