//! Error handling module
//!
//! Centralized error taxonomy surfaced to callers of the wallet and
//! exchange services. Callers get a small closed set of distinguishable
//! failure reasons; infrastructure detail is logged here, never exposed
//! verbatim.

use crate::domain::{AmountError, CurrencyError};
use crate::ledger::LedgerError;
use crate::rates::RateSourceError;

/// Application-wide Result type
pub type WalletResult<T> = Result<T, WalletError>;

/// Failure conditions surfaced by wallet and exchange operations.
#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    /// Malformed currency code, rejected before any mutation attempt
    #[error("Invalid currency code: {0}")]
    InvalidCurrency(String),

    /// Non-positive or out-of-range amount, rejected before any mutation attempt
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Well-formed currency code the rate source does not know
    #[error("Unsupported currency: {0}")]
    UnsupportedCurrency(String),

    /// The conditional debit affected zero rows
    #[error("Insufficient funds")]
    InsufficientFunds,

    /// Both cache and source failed to produce a rate
    #[error("Exchange rate unavailable: {0}")]
    RateUnavailable(String),

    /// Caller deadline exceeded mid-operation; the unit of work was
    /// aborted with no partial effect
    #[error("Operation timed out")]
    Timeout,

    /// Connection loss, constraint violation, or commit failure
    #[error("Storage error")]
    Storage(#[source] sqlx::Error),
}

impl WalletError {
    /// Expected business outcome (caller's input or balance state).
    /// Logged at warn level at most, never as an error.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidCurrency(_)
                | Self::InvalidAmount(_)
                | Self::UnsupportedCurrency(_)
                | Self::InsufficientFunds
        )
    }

    /// Whether retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateUnavailable(_) | Self::Timeout | Self::Storage(_)
        )
    }
}

impl From<CurrencyError> for WalletError {
    fn from(err: CurrencyError) -> Self {
        WalletError::InvalidCurrency(err.to_string())
    }
}

impl From<AmountError> for WalletError {
    fn from(err: AmountError) -> Self {
        WalletError::InvalidAmount(err.to_string())
    }
}

impl From<LedgerError> for WalletError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientFunds => WalletError::InsufficientFunds,
            LedgerError::Database(e) => WalletError::Storage(e),
            LedgerError::InvalidRecord(detail) => {
                WalletError::Storage(sqlx::Error::Decode(detail.into()))
            }
        }
    }
}

impl From<RateSourceError> for WalletError {
    fn from(err: RateSourceError) -> Self {
        match err {
            RateSourceError::UnknownCurrency(code) => WalletError::UnsupportedCurrency(code),
            RateSourceError::Unavailable(detail) => WalletError::RateUnavailable(detail),
            RateSourceError::Malformed(detail) => WalletError::RateUnavailable(detail),
        }
    }
}
