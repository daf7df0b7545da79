//! Wallet service
//!
//! Deposit, withdraw, and balance reads over the ledger store, with the
//! caller deadline applied around each unit of work and large-transfer
//! notification dispatched after commit. Capabilities are injected
//! per-dependency; there is no combined facade.

use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::domain::{Amount, BalanceSnapshot, Currency, TransactionRecord};
use crate::error::{WalletError, WalletResult};
use crate::events::{LargeOperation, Notifier};
use crate::ledger::{LedgerError, WalletStore};

/// Single-currency wallet operations for authenticated users.
pub struct WalletService {
    store: Arc<dyn WalletStore>,
    notifier: Notifier,
    operation_timeout: Duration,
}

impl WalletService {
    pub fn new(store: Arc<dyn WalletStore>, notifier: Notifier, operation_timeout: Duration) -> Self {
        Self {
            store,
            notifier,
            operation_timeout,
        }
    }

    /// Log a failed operation at the severity its class deserves and pass
    /// it through unchanged. Expected business outcomes stay at warn.
    fn trace_failure(operation: &'static str, user_id: Uuid, err: WalletError) -> WalletError {
        if err.is_client_error() {
            tracing::warn!(operation, user_id = %user_id, error = %err, "wallet operation rejected");
        } else {
            tracing::error!(operation, user_id = %user_id, error = ?err, "wallet operation failed");
        }
        err
    }

    /// Run one store call under the configured deadline. On expiry the
    /// in-flight unit of work is dropped, which rolls it back; no partial
    /// effect survives.
    async fn with_deadline<T>(
        &self,
        operation: &'static str,
        user_id: Uuid,
        fut: impl std::future::Future<Output = Result<T, LedgerError>>,
    ) -> WalletResult<T> {
        match tokio::time::timeout(self.operation_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(Self::trace_failure(operation, user_id, e.into())),
            Err(_) => Err(Self::trace_failure(operation, user_id, WalletError::Timeout)),
        }
    }

    /// Read-only snapshot of all balances for one user.
    pub async fn get_balance(&self, user_id: Uuid) -> WalletResult<BalanceSnapshot> {
        self.with_deadline("get_balance", user_id, self.store.get_balance(user_id))
            .await
    }

    /// Credit a wallet and record the deposit.
    pub async fn deposit(
        &self,
        user_id: Uuid,
        currency: Currency,
        amount: Amount,
    ) -> WalletResult<BalanceSnapshot> {
        let (balances, transaction_id) = self
            .with_deadline(
                "deposit",
                user_id,
                self.store.deposit(user_id, &currency, &amount),
            )
            .await?;

        self.notifier.dispatch(
            user_id,
            LargeOperation::Deposit,
            amount.value(),
            currency,
            transaction_id,
        );

        Ok(balances)
    }

    /// Debit a wallet if it holds enough, and record the withdrawal.
    pub async fn withdraw(
        &self,
        user_id: Uuid,
        currency: Currency,
        amount: Amount,
    ) -> WalletResult<BalanceSnapshot> {
        let (balances, transaction_id) = self
            .with_deadline(
                "withdraw",
                user_id,
                self.store.withdraw(user_id, &currency, &amount),
            )
            .await?;

        self.notifier.dispatch(
            user_id,
            LargeOperation::Withdraw,
            amount.value(),
            currency,
            transaction_id,
        );

        Ok(balances)
    }

    /// Recent transaction history, newest first.
    pub async fn history(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> WalletResult<Vec<TransactionRecord>> {
        self.with_deadline(
            "history",
            user_id,
            self.store.list_transactions(user_id, limit),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TransactionKind;
    use crate::events::testing::CapturePublisher;
    use crate::events::LargeTransferEvent;
    use crate::ledger::mock::MemoryLedger;
    use rust_decimal_macros::dec;
    use tokio::sync::mpsc::error::TryRecvError;

    fn usd() -> Currency {
        Currency::new("USD").unwrap()
    }

    fn amount(s: &str) -> Amount {
        s.parse().unwrap()
    }

    fn service_with(
        ledger: Arc<MemoryLedger>,
    ) -> (
        WalletService,
        tokio::sync::mpsc::UnboundedReceiver<(String, Vec<u8>)>,
    ) {
        let (publisher, rx) = CapturePublisher::new();
        let service = WalletService::new(
            ledger,
            Notifier::new(publisher),
            Duration::from_secs(5),
        );
        (service, rx)
    }

    #[tokio::test]
    async fn test_balance_of_unknown_user_is_empty() {
        let (service, _rx) = service_with(Arc::new(MemoryLedger::new()));
        let balances = service.get_balance(Uuid::new_v4()).await.unwrap();
        assert!(balances.is_empty());
    }

    #[tokio::test]
    async fn test_deposits_accumulate() {
        let ledger = Arc::new(MemoryLedger::new());
        let (service, _rx) = service_with(ledger.clone());
        let user_id = Uuid::new_v4();

        service.deposit(user_id, usd(), amount("70")).await.unwrap();
        let balances = service.deposit(user_id, usd(), amount("30")).await.unwrap();

        assert_eq!(balances.get(&usd()), Some(&dec!(100)));
        assert_eq!(ledger.transactions_of(user_id).await.len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_deposits_are_commutative() {
        let ledger = Arc::new(MemoryLedger::new());
        let (service, _rx) = service_with(ledger.clone());
        let service = Arc::new(service);
        let user_id = Uuid::new_v4();
        let other_user = Uuid::new_v4();

        let a = {
            let service = service.clone();
            tokio::spawn(async move { service.deposit(user_id, usd(), amount("70")).await })
        };
        let b = {
            let service = service.clone();
            tokio::spawn(async move { service.deposit(user_id, usd(), amount("30")).await })
        };
        // Unrelated user's traffic interleaves freely.
        let c = {
            let service = service.clone();
            tokio::spawn(async move { service.deposit(other_user, usd(), amount("999")).await })
        };

        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();
        c.await.unwrap().unwrap();

        assert_eq!(ledger.balance_of(user_id, &usd()).await, dec!(100));
        assert_eq!(ledger.balance_of(other_user, &usd()).await, dec!(999));
    }

    #[tokio::test]
    async fn test_withdraw_reduces_balance_exactly() {
        let ledger = Arc::new(MemoryLedger::new());
        let (service, _rx) = service_with(ledger.clone());
        let user_id = Uuid::new_v4();

        service.deposit(user_id, usd(), amount("100")).await.unwrap();
        let balances = service
            .withdraw(user_id, usd(), amount("37.5"))
            .await
            .unwrap();

        assert_eq!(balances.get(&usd()), Some(&dec!(62.5)));
    }

    #[tokio::test]
    async fn test_overdraw_fails_and_leaves_balance_unchanged() {
        let ledger = Arc::new(MemoryLedger::new());
        let (service, _rx) = service_with(ledger.clone());
        let user_id = Uuid::new_v4();

        service.deposit(user_id, usd(), amount("100")).await.unwrap();
        let result = service.withdraw(user_id, usd(), amount("150")).await;

        assert!(matches!(result, Err(WalletError::InsufficientFunds)));
        assert_eq!(ledger.balance_of(user_id, &usd()).await, dec!(100));
        // No withdraw transaction was recorded for the failed attempt.
        let kinds: Vec<TransactionKind> = ledger
            .transactions_of(user_id)
            .await
            .iter()
            .map(|t| t.kind)
            .collect();
        assert_eq!(kinds, vec![TransactionKind::Deposit]);
    }

    #[tokio::test]
    async fn test_concurrent_withdrawals_exactly_one_wins() {
        let ledger = Arc::new(MemoryLedger::new());
        let (service, _rx) = service_with(ledger.clone());
        let service = Arc::new(service);
        let user_id = Uuid::new_v4();

        service.deposit(user_id, usd(), amount("100")).await.unwrap();

        let a = {
            let service = service.clone();
            tokio::spawn(async move { service.withdraw(user_id, usd(), amount("60")).await })
        };
        let b = {
            let service = service.clone();
            tokio::spawn(async move { service.withdraw(user_id, usd(), amount("60")).await })
        };

        let results = [a.await.unwrap(), b.await.unwrap()];
        let successes = results.iter().filter(|r| r.is_ok()).count();
        let insufficient = results
            .iter()
            .filter(|r| matches!(r, Err(WalletError::InsufficientFunds)))
            .count();

        assert_eq!(successes, 1);
        assert_eq!(insufficient, 1);
        assert_eq!(ledger.balance_of(user_id, &usd()).await, dec!(40));
    }

    #[tokio::test]
    async fn test_large_deposit_publishes_one_event() {
        let ledger = Arc::new(MemoryLedger::new());
        let (service, mut rx) = service_with(ledger);
        let user_id = Uuid::new_v4();

        service
            .deposit(user_id, usd(), amount("31000"))
            .await
            .unwrap();

        let (_, payload) = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("no event published")
            .unwrap();
        let event: LargeTransferEvent = serde_json::from_slice(&payload).unwrap();
        assert_eq!(event.operation, "LARGE_DEPOSIT");
        assert_eq!(event.amount, "31000");
        assert_eq!(event.currency, "USD");

        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_small_deposit_publishes_nothing() {
        let ledger = Arc::new(MemoryLedger::new());
        let (service, mut rx) = service_with(ledger);

        service
            .deposit(Uuid::new_v4(), usd(), amount("500"))
            .await
            .unwrap();

        // Give any stray dispatch task a chance to run.
        tokio::task::yield_now().await;
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_deadline_expiry_surfaces_timeout_with_no_effect() {
        let ledger = Arc::new(MemoryLedger::new().with_delay(Duration::from_millis(200)));
        let (publisher, _rx) = CapturePublisher::new();
        let service = WalletService::new(
            ledger.clone(),
            Notifier::new(publisher),
            Duration::from_millis(10),
        );
        let user_id = Uuid::new_v4();

        let result = service.deposit(user_id, usd(), amount("100")).await;

        assert!(matches!(result, Err(WalletError::Timeout)));
        assert_eq!(ledger.balance_of(user_id, &usd()).await, dec!(0));
        assert!(ledger.transactions_of(user_id).await.is_empty());
    }

    #[tokio::test]
    async fn test_history_is_newest_first() {
        let ledger = Arc::new(MemoryLedger::new());
        let (service, _rx) = service_with(ledger);
        let user_id = Uuid::new_v4();

        service.deposit(user_id, usd(), amount("100")).await.unwrap();
        service.withdraw(user_id, usd(), amount("40")).await.unwrap();

        let history = service.history(user_id, 10).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].kind, TransactionKind::Withdraw);
        assert_eq!(history[1].kind, TransactionKind::Deposit);
    }
}
