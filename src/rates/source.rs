//! External rate source client
//!
//! The source of truth for exchange rates lives in a separate service;
//! this module is only its consuming boundary. Connectivity and retry are
//! the source's own concern — failures here surface as
//! [`RateSourceError`] and the resolver decides what to do with them.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use crate::domain::Currency;

/// Per-request deadline against the rate service.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

/// Errors from the external rate source.
#[derive(Debug, thiserror::Error)]
pub enum RateSourceError {
    /// The source does not quote this currency or pair
    #[error("Unknown currency: {0}")]
    UnknownCurrency(String),

    /// The source could not be reached or answered with a server error
    #[error("Rate source unavailable: {0}")]
    Unavailable(String),

    /// The source answered with a payload we could not interpret
    #[error("Malformed rate payload: {0}")]
    Malformed(String),
}

/// Provider of exchange rates.
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Fetch the full table of rates, keyed by currency code.
    async fn fetch_rates(&self) -> Result<HashMap<String, Decimal>, RateSourceError>;

    /// Fetch the rate for one ordered currency pair.
    async fn fetch_rate(&self, from: &Currency, to: &Currency)
        -> Result<Decimal, RateSourceError>;
}

#[derive(Debug, Deserialize)]
struct RatesResponse {
    rates: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct RateResponse {
    rate: String,
}

/// HTTP/JSON client for the exchange-rate service.
///
/// Endpoints: `GET {base}/rates` for the full table and
/// `GET {base}/rates/{from}/{to}` for a single pair. Rates travel as
/// decimal-precision strings and are parsed exactly, never through floats.
pub struct HttpRateSource {
    http: reqwest::Client,
    base_url: String,
}

impl HttpRateSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn parse_decimal(raw: &str) -> Result<Decimal, RateSourceError> {
        Decimal::from_str(raw)
            .map_err(|e| RateSourceError::Malformed(format!("rate {:?}: {}", raw, e)))
    }
}

#[async_trait]
impl RateSource for HttpRateSource {
    async fn fetch_rates(&self) -> Result<HashMap<String, Decimal>, RateSourceError> {
        let url = format!("{}/rates", self.base_url);
        let response = self
            .http
            .get(&url)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| RateSourceError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(RateSourceError::Unavailable(format!(
                "rate source returned {}",
                response.status()
            )));
        }

        let body: RatesResponse = response
            .json()
            .await
            .map_err(|e| RateSourceError::Malformed(e.to_string()))?;

        let mut rates = HashMap::with_capacity(body.rates.len());
        for (code, raw) in body.rates {
            rates.insert(code, Self::parse_decimal(&raw)?);
        }
        Ok(rates)
    }

    async fn fetch_rate(
        &self,
        from: &Currency,
        to: &Currency,
    ) -> Result<Decimal, RateSourceError> {
        let url = format!("{}/rates/{}/{}", self.base_url, from, to);
        let response = self
            .http
            .get(&url)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| RateSourceError::Unavailable(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(RateSourceError::UnknownCurrency(format!("{}/{}", from, to)));
        }

        if !response.status().is_success() {
            return Err(RateSourceError::Unavailable(format!(
                "rate source returned {}",
                response.status()
            )));
        }

        let body: RateResponse = response
            .json()
            .await
            .map_err(|e| RateSourceError::Malformed(e.to_string()))?;

        Self::parse_decimal(&body.rate)
    }
}
