//! Exchange engine
//!
//! Composes rate resolution with the ledger's two-leg exchange mutation:
//! price the request from a resolved rate, delegate the atomic debit and
//! credit, then announce large transfers. Rate errors and ledger errors
//! stay distinct all the way to the caller.

use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::domain::money::MAX_SCALE;
use crate::domain::{Amount, BalanceSnapshot, Currency, ExchangeQuote};
use crate::error::{WalletError, WalletResult};
use crate::events::{LargeOperation, Notifier};
use crate::ledger::ExchangeStore;
use crate::rates::RateResolver;

/// Currency exchange over one user's wallets.
pub struct ExchangeService {
    resolver: Arc<RateResolver>,
    store: Arc<dyn ExchangeStore>,
    notifier: Notifier,
    operation_timeout: Duration,
}

impl ExchangeService {
    pub fn new(
        resolver: Arc<RateResolver>,
        store: Arc<dyn ExchangeStore>,
        notifier: Notifier,
        operation_timeout: Duration,
    ) -> Self {
        Self {
            resolver,
            store,
            notifier,
            operation_timeout,
        }
    }

    /// Current rate table from the resolver.
    pub async fn get_rates(&self) -> WalletResult<HashMap<String, Decimal>> {
        Ok(self.resolver.get_rates().await?)
    }

    /// Rate for one ordered pair.
    pub async fn get_rate(&self, from: &Currency, to: &Currency) -> WalletResult<Decimal> {
        Ok(self.resolver.get_rate(from, to).await?)
    }

    /// Price one request: resolve the rate and compute the converted
    /// amount with exact decimal multiplication, clamped to the ledger's
    /// fixed precision.
    async fn quote(
        &self,
        from: &Currency,
        to: &Currency,
        amount: &Amount,
    ) -> WalletResult<ExchangeQuote> {
        let rate = self.resolver.get_rate(from, to).await?;
        let converted_amount = (amount.value() * rate).round_dp(MAX_SCALE);

        Ok(ExchangeQuote {
            from: from.clone(),
            to: to.clone(),
            rate,
            converted_amount,
        })
    }

    /// Exchange `amount` of `from` into `to` atomically.
    ///
    /// On success the large-transfer check runs against the DEBITED leg —
    /// the amount the user moved out, not what they received — and is
    /// dispatched outside this operation's deadline.
    pub async fn exchange_currency(
        &self,
        user_id: Uuid,
        from: Currency,
        to: Currency,
        amount: Amount,
    ) -> WalletResult<BalanceSnapshot> {
        let quote = self.quote(&from, &to, &amount).await.map_err(|e| {
            tracing::warn!(user_id = %user_id, from_currency = %from, to_currency = %to, error = %e,
                "exchange rate resolution failed");
            e
        })?;

        let converted = Amount::new(quote.converted_amount)?;

        let outcome = tokio::time::timeout(
            self.operation_timeout,
            self.store.exchange(user_id, &from, &to, &amount, &converted),
        )
        .await;

        let (balances, transaction_id) = match outcome {
            Ok(Ok(value)) => value,
            Ok(Err(e)) => {
                let err = WalletError::from(e);
                if err.is_client_error() {
                    tracing::warn!(user_id = %user_id, from_currency = %from, to_currency = %to, error = %err,
                        "exchange rejected");
                } else {
                    tracing::error!(user_id = %user_id, from_currency = %from, to_currency = %to, error = ?err,
                        "exchange failed");
                }
                return Err(err);
            }
            Err(_) => {
                tracing::error!(user_id = %user_id, from_currency = %from, to_currency = %to,
                    "exchange timed out");
                return Err(WalletError::Timeout);
            }
        };

        self.notifier.dispatch(
            user_id,
            LargeOperation::Exchange,
            amount.value(),
            from,
            transaction_id,
        );

        Ok(balances)
    }
}
