//! SQS event publisher
//!
//! Production implementation of the outbound message channel. Delivery
//! guarantees stronger than at-most-once are the queue's concern, not
//! this client's; there are no retries here.

use async_trait::async_trait;
use aws_sdk_sqs::types::MessageAttributeValue;

use super::{EventPublisher, PublishError};

/// Publishes event payloads to one SQS queue, carrying the partition key
/// as a message attribute.
#[derive(Clone)]
pub struct SqsPublisher {
    client: aws_sdk_sqs::Client,
    queue_url: String,
}

impl SqsPublisher {
    pub fn new(client: aws_sdk_sqs::Client, queue_url: impl Into<String>) -> Self {
        Self {
            client,
            queue_url: queue_url.into(),
        }
    }

    /// Build a publisher from ambient AWS configuration.
    pub async fn from_env(queue_url: impl Into<String>) -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::new(aws_sdk_sqs::Client::new(&config), queue_url)
    }
}

#[async_trait]
impl EventPublisher for SqsPublisher {
    async fn publish(&self, key: &str, payload: &[u8]) -> Result<(), PublishError> {
        let body = std::str::from_utf8(payload)
            .map_err(|e| PublishError::Encoding(e.to_string()))?
            .to_string();

        let partition_key = MessageAttributeValue::builder()
            .data_type("String")
            .string_value(key)
            .build()
            .map_err(|e| PublishError::Encoding(e.to_string()))?;

        self.client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(body)
            .message_attributes("partition_key", partition_key)
            .send()
            .await
            .map_err(|e| PublishError::Channel(e.to_string()))?;

        Ok(())
    }
}
