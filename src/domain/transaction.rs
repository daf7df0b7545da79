//! Transaction records
//!
//! Immutable audit-trail types. A record is created exactly once per
//! successful ledger mutation and never updated or deleted; wallet history
//! is reconstructed only from these records.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::money::Currency;

/// Full per-currency balance view for one user, as returned by every
/// ledger read and after every mutation.
pub type BalanceSnapshot = BTreeMap<Currency, Decimal>;

/// Kind of ledger mutation a transaction records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Deposit,
    Withdraw,
    Exchange,
}

impl TransactionKind {
    /// Stable storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Deposit => "deposit",
            TransactionKind::Withdraw => "withdraw",
            TransactionKind::Exchange => "exchange",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deposit" => Ok(TransactionKind::Deposit),
            "withdraw" => Ok(TransactionKind::Withdraw),
            "exchange" => Ok(TransactionKind::Exchange),
            other => Err(format!("unknown transaction kind: {}", other)),
        }
    }
}

/// One committed ledger mutation.
///
/// For exchanges, `currency`/`amount` describe the debited leg and
/// `to_currency`/`converted_amount` the credited leg; both legs are always
/// present together.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: TransactionKind,
    pub currency: Currency,
    pub amount: Decimal,
    pub to_currency: Option<Currency>,
    pub converted_amount: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

/// Transient result of pricing one exchange request. Never persisted;
/// the converted amount is recomputed per request from a fresh rate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeQuote {
    pub from: Currency,
    pub to: Currency,
    pub rate: Decimal,
    pub converted_amount: Decimal,
}
