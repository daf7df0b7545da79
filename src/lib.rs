//! currency_wallet
//!
//! Multi-currency wallet ledger core: atomic balance mutations over
//! Postgres, cache-aside exchange-rate resolution against an external
//! rate source, and best-effort large-transfer event emission. The HTTP
//! and auth layer in front of this crate is a separate concern; the
//! service types in [`wallet`] and [`exchange`] are the exposed surface.

pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod events;
pub mod exchange;
pub mod ledger;
pub mod rates;
pub mod wallet;

pub use config::Config;
pub use domain::{Amount, BalanceSnapshot, Currency, TransactionKind, TransactionRecord};
pub use error::{WalletError, WalletResult};
pub use events::Notifier;
pub use exchange::ExchangeService;
pub use ledger::PostgresLedger;
pub use rates::RateResolver;
pub use wallet::WalletService;
