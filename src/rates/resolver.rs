//! Cache-aside rate resolution
//!
//! Consults the cache first, falls back to the external source on miss,
//! and repopulates the cache with a fixed TTL. Rates are read far more
//! often than they change, so staleness up to the TTL window is accepted;
//! cache failures of any kind degrade to a source query and never fail
//! the read path.

use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::Currency;

use super::cache::RateCache;
use super::source::{RateSource, RateSourceError};

/// TTL for the cached full rate table.
const TABLE_TTL: Duration = Duration::from_secs(5 * 60);

/// TTL for one cached currency pair.
const PAIR_TTL: Duration = Duration::from_secs(2 * 60);

/// Resolves exchange rates through the cache with the source as fallback.
pub struct RateResolver {
    cache: Arc<dyn RateCache>,
    source: Arc<dyn RateSource>,
}

impl RateResolver {
    pub fn new(cache: Arc<dyn RateCache>, source: Arc<dyn RateSource>) -> Self {
        Self { cache, source }
    }

    fn pair_key(from: &Currency, to: &Currency) -> String {
        format!("exchange:rate:{}:{}", from, to)
    }

    /// Full rate table, cached for five minutes.
    pub async fn get_rates(&self) -> Result<HashMap<String, Decimal>, RateSourceError> {
        match self.cache.get_rates().await {
            Ok(Some(table)) => match parse_table(table) {
                Ok(rates) => return Ok(rates),
                Err(detail) => {
                    tracing::warn!(detail = %detail, "discarding malformed cached rate table")
                }
            },
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "rate table cache read failed"),
        }

        let rates = self.source.fetch_rates().await?;

        let as_strings: HashMap<String, String> = rates
            .iter()
            .map(|(code, rate)| (code.clone(), rate.to_string()))
            .collect();
        if let Err(e) = self.cache.set_rates(&as_strings, TABLE_TTL).await {
            tracing::warn!(error = %e, "failed to cache rate table");
        }

        Ok(rates)
    }

    /// Rate for one ordered pair, cached for two minutes.
    ///
    /// The identity pair is exactly 1 and consults neither cache nor
    /// source.
    pub async fn get_rate(
        &self,
        from: &Currency,
        to: &Currency,
    ) -> Result<Decimal, RateSourceError> {
        if from == to {
            return Ok(Decimal::ONE);
        }

        let key = Self::pair_key(from, to);
        match self.cache.get(&key).await {
            Ok(Some(raw)) => match Decimal::from_str(&raw) {
                Ok(rate) => return Ok(rate),
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "discarding malformed cached rate")
                }
            },
            Ok(None) => {}
            Err(e) => tracing::warn!(key = %key, error = %e, "rate cache read failed"),
        }

        let rate = self.source.fetch_rate(from, to).await?;

        if let Err(e) = self.cache.set(&key, &rate.to_string(), PAIR_TTL).await {
            tracing::warn!(key = %key, error = %e, "failed to cache rate");
        }

        Ok(rate)
    }
}

fn parse_table(table: HashMap<String, String>) -> Result<HashMap<String, Decimal>, String> {
    let mut rates = HashMap::with_capacity(table.len());
    for (code, raw) in table {
        let rate =
            Decimal::from_str(&raw).map_err(|e| format!("rate {:?} for {}: {}", raw, code, e))?;
        rates.insert(code, rate);
    }
    Ok(rates)
}
