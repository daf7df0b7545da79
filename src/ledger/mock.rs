//! In-memory ledger double for service tests
//!
//! Reproduces the store contract — conditional debits, implicit wallet
//! creation, all-or-nothing exchanges — over a mutex-guarded map, with
//! hooks for injecting latency and a failure between the exchange legs.

use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

use async_trait::async_trait;

use crate::domain::{
    Amount, BalanceSnapshot, Currency, TransactionKind, TransactionRecord,
};

use super::{ExchangeStore, LedgerError, WalletStore};

#[derive(Default)]
struct State {
    wallets: HashMap<(Uuid, Currency), Decimal>,
    transactions: Vec<TransactionRecord>,
}

#[derive(Default)]
pub(crate) struct MemoryLedger {
    state: Mutex<State>,
    /// When set, `exchange` fails after the debit check but before any
    /// state is written, simulating an infrastructure failure between the
    /// two legs.
    pub(crate) fail_between_legs: AtomicBool,
    delay: Option<Duration>,
}

impl MemoryLedger {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Add artificial latency at the start of every operation.
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    async fn simulate_latency(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }

    pub(crate) async fn balance_of(&self, user_id: Uuid, currency: &Currency) -> Decimal {
        let state = self.state.lock().await;
        state
            .wallets
            .get(&(user_id, currency.clone()))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    pub(crate) async fn transactions_of(&self, user_id: Uuid) -> Vec<TransactionRecord> {
        let state = self.state.lock().await;
        state
            .transactions
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect()
    }

    fn snapshot_of(state: &State, user_id: Uuid) -> BalanceSnapshot {
        state
            .wallets
            .iter()
            .filter(|((owner, _), _)| *owner == user_id)
            .map(|((_, currency), balance)| (currency.clone(), *balance))
            .collect()
    }
}

#[async_trait]
impl WalletStore for MemoryLedger {
    async fn get_balance(&self, user_id: Uuid) -> Result<BalanceSnapshot, LedgerError> {
        let state = self.state.lock().await;
        Ok(Self::snapshot_of(&state, user_id))
    }

    async fn deposit(
        &self,
        user_id: Uuid,
        currency: &Currency,
        amount: &Amount,
    ) -> Result<(BalanceSnapshot, Uuid), LedgerError> {
        self.simulate_latency().await;

        let mut state = self.state.lock().await;
        *state
            .wallets
            .entry((user_id, currency.clone()))
            .or_insert(Decimal::ZERO) += amount.value();

        let transaction_id = Uuid::new_v4();
        state.transactions.push(TransactionRecord {
            id: transaction_id,
            user_id,
            kind: TransactionKind::Deposit,
            currency: currency.clone(),
            amount: amount.value(),
            to_currency: None,
            converted_amount: None,
            created_at: Utc::now(),
        });

        Ok((Self::snapshot_of(&state, user_id), transaction_id))
    }

    async fn withdraw(
        &self,
        user_id: Uuid,
        currency: &Currency,
        amount: &Amount,
    ) -> Result<(BalanceSnapshot, Uuid), LedgerError> {
        self.simulate_latency().await;

        let mut state = self.state.lock().await;
        let balance = state
            .wallets
            .get(&(user_id, currency.clone()))
            .copied()
            .unwrap_or(Decimal::ZERO);
        if balance < amount.value() {
            return Err(LedgerError::InsufficientFunds);
        }

        state
            .wallets
            .insert((user_id, currency.clone()), balance - amount.value());

        let transaction_id = Uuid::new_v4();
        state.transactions.push(TransactionRecord {
            id: transaction_id,
            user_id,
            kind: TransactionKind::Withdraw,
            currency: currency.clone(),
            amount: amount.value(),
            to_currency: None,
            converted_amount: None,
            created_at: Utc::now(),
        });

        Ok((Self::snapshot_of(&state, user_id), transaction_id))
    }

    async fn list_transactions(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<TransactionRecord>, LedgerError> {
        let state = self.state.lock().await;
        Ok(state
            .transactions
            .iter()
            .filter(|t| t.user_id == user_id)
            .rev()
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ExchangeStore for MemoryLedger {
    async fn exchange(
        &self,
        user_id: Uuid,
        from: &Currency,
        to: &Currency,
        amount: &Amount,
        converted: &Amount,
    ) -> Result<(BalanceSnapshot, Uuid), LedgerError> {
        self.simulate_latency().await;

        let mut state = self.state.lock().await;
        let from_balance = state
            .wallets
            .get(&(user_id, from.clone()))
            .copied()
            .unwrap_or(Decimal::ZERO);
        if from_balance < amount.value() {
            return Err(LedgerError::InsufficientFunds);
        }

        // All checks passed; nothing has been written yet, so an injected
        // failure here must leave no trace of either leg.
        if self.fail_between_legs.load(Ordering::SeqCst) {
            return Err(LedgerError::Database(sqlx::Error::Protocol(
                "injected failure between exchange legs".to_string(),
            )));
        }

        state
            .wallets
            .insert((user_id, from.clone()), from_balance - amount.value());
        *state
            .wallets
            .entry((user_id, to.clone()))
            .or_insert(Decimal::ZERO) += converted.value();

        let transaction_id = Uuid::new_v4();
        state.transactions.push(TransactionRecord {
            id: transaction_id,
            user_id,
            kind: TransactionKind::Exchange,
            currency: from.clone(),
            amount: amount.value(),
            to_currency: Some(to.clone()),
            converted_amount: Some(converted.value()),
            created_at: Utc::now(),
        });

        Ok((Self::snapshot_of(&state, user_id), transaction_id))
    }
}
