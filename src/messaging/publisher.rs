use async_trait::async_trait;

use crate::domain::order::Order;
use crate::pipeline::MessageHeaders;

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("failed to serialize order: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("circuit breaker open for broker")]
    CircuitOpen,

    #[error("broker rejected message: {0}")]
    Broker(String),
}

/// Sends an order to a topic, keyed by its order id.
///
/// The future resolves once the broker has acknowledged (or refused) the
/// record, so callers can branch on the outcome.
#[async_trait]
pub trait OrderPublisher: Send + Sync {
    async fn publish(
        &self,
        topic: &str,
        order: &Order,
        headers: &MessageHeaders,
    ) -> Result<(), PublishError>;
}
