//! Ledger store
//!
//! The transactional core: per-user per-currency balances plus an
//! append-only transaction log, mutated only through atomic operations.
//! The storage seams are traits so services can be exercised against an
//! in-memory double; production uses [`PostgresLedger`] for both.

pub mod postgres;

#[cfg(test)]
pub(crate) mod mock;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Amount, BalanceSnapshot, Currency, TransactionRecord};

pub use postgres::PostgresLedger;

/// Errors from ledger storage operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The conditional debit matched zero rows
    #[error("Insufficient funds")]
    InsufficientFunds,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A persisted row failed to decode into domain types
    #[error("Invalid stored record: {0}")]
    InvalidRecord(String),
}

/// Balance reads and single-currency mutations.
#[async_trait]
pub trait WalletStore: Send + Sync {
    /// Read-only snapshot of all balances for one user.
    async fn get_balance(&self, user_id: Uuid) -> Result<BalanceSnapshot, LedgerError>;

    /// Credit one balance, creating it on first deposit. Returns the
    /// updated snapshot and the new transaction id.
    async fn deposit(
        &self,
        user_id: Uuid,
        currency: &Currency,
        amount: &Amount,
    ) -> Result<(BalanceSnapshot, Uuid), LedgerError>;

    /// Debit one balance if and only if it holds at least `amount`.
    async fn withdraw(
        &self,
        user_id: Uuid,
        currency: &Currency,
        amount: &Amount,
    ) -> Result<(BalanceSnapshot, Uuid), LedgerError>;

    /// Most recent transactions for one user, newest first.
    async fn list_transactions(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<TransactionRecord>, LedgerError>;
}

/// The two-leg exchange mutation.
#[async_trait]
pub trait ExchangeStore: Send + Sync {
    /// Debit `from` conditionally, credit `to` unconditionally, and record
    /// one exchange transaction — all three effects atomically.
    async fn exchange(
        &self,
        user_id: Uuid,
        from: &Currency,
        to: &Currency,
        amount: &Amount,
        converted: &Amount,
    ) -> Result<(BalanceSnapshot, Uuid), LedgerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_error_display() {
        let err = LedgerError::InsufficientFunds;
        assert_eq!(err.to_string(), "Insufficient funds");

        let err = LedgerError::InvalidRecord("bad currency".to_string());
        assert!(err.to_string().contains("bad currency"));
    }
}
