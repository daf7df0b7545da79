//! Exchange-rate subsystem
//!
//! Cache-aside resolution of exchange rates: a TTL'd key/value cache
//! (in-process or redis, selected once at startup) in front of the
//! external rate source.

pub mod cache;
pub mod redis;
pub mod resolver;
pub mod source;

use std::sync::Arc;

use crate::config::Config;

pub use cache::{CacheError, MemoryRateCache, RateCache, RATES_CACHE_KEY};
pub use self::redis::RedisRateCache;
pub use resolver::RateResolver;
pub use source::{HttpRateSource, RateSource, RateSourceError};

/// Build the cache backend selected by configuration: redis when a URL is
/// configured, the in-process map otherwise.
pub async fn cache_from_config(config: &Config) -> Result<Arc<dyn RateCache>, CacheError> {
    match &config.redis_url {
        Some(url) => Ok(Arc::new(RedisRateCache::connect(url).await?)),
        None => {
            tracing::info!("no REDIS_URL configured, using in-process rate cache");
            Ok(Arc::new(MemoryRateCache::new()))
        }
    }
}
