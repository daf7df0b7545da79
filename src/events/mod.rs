//! Large-transfer event notification
//!
//! Transactions at or above a fixed threshold are announced on an
//! outbound message channel for downstream consumers. The signal is
//! strictly best-effort from this side: publish failures are logged and
//! swallowed, and a failed publish never unwinds the already-committed
//! ledger mutation.

pub mod sqs;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::Currency;

pub use sqs::SqsPublisher;

/// Amount at or above which a transaction is announced.
const LARGE_TRANSFER_THRESHOLD: i64 = 30_000;

/// Operation labels carried in event payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LargeOperation {
    Deposit,
    Withdraw,
    Exchange,
}

impl LargeOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            LargeOperation::Deposit => "LARGE_DEPOSIT",
            LargeOperation::Withdraw => "LARGE_WITHDRAW",
            LargeOperation::Exchange => "LARGE_EXCHANGE",
        }
    }
}

/// Payload published for one large transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LargeTransferEvent {
    pub transaction_id: String,
    pub user_id: String,
    pub operation: String,
    pub amount: String,
    pub currency: String,
}

/// Errors from the outbound message channel.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Message channel error: {0}")]
    Channel(String),

    #[error("Payload encoding error: {0}")]
    Encoding(String),
}

/// Outbound message channel: fire-and-forget keyed publish.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, key: &str, payload: &[u8]) -> Result<(), PublishError>;
}

/// Emits large-transfer events. Cheap to clone; shared across services.
#[derive(Clone)]
pub struct Notifier {
    publisher: Arc<dyn EventPublisher>,
}

impl Notifier {
    pub fn new(publisher: Arc<dyn EventPublisher>) -> Self {
        Self { publisher }
    }

    fn threshold() -> Decimal {
        Decimal::from(LARGE_TRANSFER_THRESHOLD)
    }

    /// Publish an event if `amount` is at or above the threshold.
    ///
    /// Below the threshold this is a no-op. Failures never reach the
    /// caller.
    pub async fn notify_if_large(
        &self,
        user_id: Uuid,
        operation: LargeOperation,
        amount: Decimal,
        currency: &Currency,
        transaction_id: Uuid,
    ) {
        if amount < Self::threshold() {
            return;
        }

        let event = LargeTransferEvent {
            transaction_id: transaction_id.to_string(),
            user_id: user_id.to_string(),
            operation: operation.as_str().to_string(),
            amount: amount.to_string(),
            currency: currency.to_string(),
        };

        let payload = match serde_json::to_vec(&event) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(error = %e, transaction_id = %transaction_id,
                    "failed to encode large operation event");
                return;
            }
        };

        match self.publisher.publish(&event.user_id, &payload).await {
            Ok(()) => tracing::info!(
                operation = operation.as_str(),
                amount = %event.amount,
                currency = %event.currency,
                transaction_id = %transaction_id,
                "large operation event sent"
            ),
            Err(e) => tracing::error!(
                error = %e,
                transaction_id = %transaction_id,
                "failed to publish large operation event"
            ),
        }
    }

    /// Fire-and-forget dispatch on a separate task.
    ///
    /// Runs outside the deadline of the operation that produced the
    /// transaction and may complete after that call has returned.
    pub fn dispatch(
        &self,
        user_id: Uuid,
        operation: LargeOperation,
        amount: Decimal,
        currency: Currency,
        transaction_id: Uuid,
    ) {
        let notifier = self.clone();
        tokio::spawn(async move {
            notifier
                .notify_if_large(user_id, operation, amount, &currency, transaction_id)
                .await;
        });
    }
}
