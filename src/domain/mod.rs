//! Domain module
//!
//! Core domain types shared by the ledger, exchange, and event layers.

pub mod money;
pub mod transaction;

pub use money::{Amount, AmountError, Currency, CurrencyError};
pub use transaction::{BalanceSnapshot, ExchangeQuote, TransactionKind, TransactionRecord};
