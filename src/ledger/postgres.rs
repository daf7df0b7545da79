//! Postgres ledger implementation
//!
//! Every mutating operation runs inside one sqlx transaction: balance
//! change(s) plus the transaction-log insert either all commit or all
//! roll back. Concurrency control for debits is the conditional update
//! itself — `balance = balance - $n WHERE ... AND balance >= $n` — so no
//! two concurrent debits can drive a balance negative; the loser of the
//! race simply matches zero rows. No mutation is retried here; retry
//! policy belongs to the caller.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::{
    Amount, BalanceSnapshot, Currency, TransactionKind, TransactionRecord,
};

use super::{ExchangeStore, LedgerError, WalletStore};

/// Ledger over a shared Postgres pool.
#[derive(Debug, Clone)]
pub struct PostgresLedger {
    pool: PgPool,
}

impl PostgresLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Read the full balance set for a user. Runs outside the mutating
    /// transaction; the write it follows has already been serialized by
    /// the commit.
    async fn snapshot(&self, user_id: Uuid) -> Result<BalanceSnapshot, LedgerError> {
        let rows: Vec<(String, Decimal)> = sqlx::query_as(
            r#"
            SELECT currency, balance FROM wallets WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut balances = BalanceSnapshot::new();
        for (code, balance) in rows {
            let currency = Currency::new(&code)
                .map_err(|e| LedgerError::InvalidRecord(e.to_string()))?;
            balances.insert(currency, balance);
        }
        Ok(balances)
    }

    /// Credit a balance inside the given transaction, creating the
    /// (user, currency) row on first deposit.
    async fn credit(
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        currency: &Currency,
        amount: Decimal,
    ) -> Result<(), LedgerError> {
        sqlx::query(
            r#"
            INSERT INTO wallets (user_id, currency, balance)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, currency)
            DO UPDATE SET balance = wallets.balance + EXCLUDED.balance
            "#,
        )
        .bind(user_id)
        .bind(currency.as_str())
        .bind(amount)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Conditionally debit a balance inside the given transaction.
    /// Zero affected rows means the predicate rejected the debit.
    async fn debit(
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        currency: &Currency,
        amount: Decimal,
    ) -> Result<(), LedgerError> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE wallets SET balance = balance - $3
            WHERE user_id = $1 AND currency = $2 AND balance >= $3
            "#,
        )
        .bind(user_id)
        .bind(currency.as_str())
        .bind(amount)
        .execute(&mut **tx)
        .await?
        .rows_affected();

        if rows_affected == 0 {
            return Err(LedgerError::InsufficientFunds);
        }

        Ok(())
    }

    async fn insert_transaction(
        tx: &mut Transaction<'_, Postgres>,
        record_id: Uuid,
        user_id: Uuid,
        kind: TransactionKind,
        currency: &Currency,
        amount: Decimal,
        to_currency: Option<&Currency>,
        converted_amount: Option<Decimal>,
    ) -> Result<(), LedgerError> {
        sqlx::query(
            r#"
            INSERT INTO transactions
                (id, user_id, kind, currency, amount, to_currency, converted_amount)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(record_id)
        .bind(user_id)
        .bind(kind.as_str())
        .bind(currency.as_str())
        .bind(amount)
        .bind(to_currency.map(|c| c.as_str()))
        .bind(converted_amount)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl WalletStore for PostgresLedger {
    async fn get_balance(&self, user_id: Uuid) -> Result<BalanceSnapshot, LedgerError> {
        self.snapshot(user_id).await
    }

    async fn deposit(
        &self,
        user_id: Uuid,
        currency: &Currency,
        amount: &Amount,
    ) -> Result<(BalanceSnapshot, Uuid), LedgerError> {
        let mut tx = self.pool.begin().await?;

        Self::credit(&mut tx, user_id, currency, amount.value()).await?;

        let transaction_id = Uuid::new_v4();
        Self::insert_transaction(
            &mut tx,
            transaction_id,
            user_id,
            TransactionKind::Deposit,
            currency,
            amount.value(),
            None,
            None,
        )
        .await?;

        tx.commit().await?;

        let balances = self.snapshot(user_id).await?;
        Ok((balances, transaction_id))
    }

    async fn withdraw(
        &self,
        user_id: Uuid,
        currency: &Currency,
        amount: &Amount,
    ) -> Result<(BalanceSnapshot, Uuid), LedgerError> {
        let mut tx = self.pool.begin().await?;

        // An early return drops the transaction, which rolls it back.
        Self::debit(&mut tx, user_id, currency, amount.value()).await?;

        let transaction_id = Uuid::new_v4();
        Self::insert_transaction(
            &mut tx,
            transaction_id,
            user_id,
            TransactionKind::Withdraw,
            currency,
            amount.value(),
            None,
            None,
        )
        .await?;

        tx.commit().await?;

        let balances = self.snapshot(user_id).await?;
        Ok((balances, transaction_id))
    }

    async fn list_transactions(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<TransactionRecord>, LedgerError> {
        type Row = (
            Uuid,
            Uuid,
            String,
            String,
            Decimal,
            Option<String>,
            Option<Decimal>,
            DateTime<Utc>,
        );

        let rows: Vec<Row> = sqlx::query_as(
            r#"
            SELECT id, user_id, kind, currency, amount, to_currency, converted_amount, created_at
            FROM transactions
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(
                |(id, user_id, kind, currency, amount, to_currency, converted_amount, created_at)| {
                    Ok(TransactionRecord {
                        id,
                        user_id,
                        kind: kind
                            .parse::<TransactionKind>()
                            .map_err(LedgerError::InvalidRecord)?,
                        currency: Currency::new(&currency)
                            .map_err(|e| LedgerError::InvalidRecord(e.to_string()))?,
                        amount,
                        to_currency: to_currency
                            .map(|c| Currency::new(&c))
                            .transpose()
                            .map_err(|e| LedgerError::InvalidRecord(e.to_string()))?,
                        converted_amount,
                        created_at,
                    })
                },
            )
            .collect()
    }
}

#[async_trait]
impl ExchangeStore for PostgresLedger {
    async fn exchange(
        &self,
        user_id: Uuid,
        from: &Currency,
        to: &Currency,
        amount: &Amount,
        converted: &Amount,
    ) -> Result<(BalanceSnapshot, Uuid), LedgerError> {
        let mut tx = self.pool.begin().await?;

        // Only the debit leg can fail on insufficiency; the credit leg
        // always succeeds once the debit went through.
        Self::debit(&mut tx, user_id, from, amount.value()).await?;
        Self::credit(&mut tx, user_id, to, converted.value()).await?;

        let transaction_id = Uuid::new_v4();
        Self::insert_transaction(
            &mut tx,
            transaction_id,
            user_id,
            TransactionKind::Exchange,
            from,
            amount.value(),
            Some(to),
            Some(converted.value()),
        )
        .await?;

        tx.commit().await?;

        let balances = self.snapshot(user_id).await?;
        Ok((balances, transaction_id))
    }
}
