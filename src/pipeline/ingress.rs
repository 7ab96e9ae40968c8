use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;

use super::delivery::MessageHeaders;
use crate::domain::order::Order;
use crate::messaging::OrderPublisher;

// ============================================================================
// Order Ingress - publishes new orders onto the main stream
// ============================================================================
//
// Checks the fields itself rather than trusting callers or sharing the
// consumer's validation; the consumer validates again on the other side.
// Publishing is fire-and-forget: broker failures are logged, never returned.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RejectedOrder {
    #[error("Order ID is required")]
    MissingOrderId,

    #[error("Product name is required")]
    MissingProduct,

    #[error("Price must be greater than zero")]
    NonPositivePrice,
}

pub struct OrderIngress {
    publisher: Arc<dyn OrderPublisher>,
    topic: String,
    runtime: Handle,
    in_flight: TaskTracker,
}

impl OrderIngress {
    /// `runtime` is where publishes run, so callers on another runtime (the
    /// HTTP server) do not carry broker I/O. Publishes are registered with
    /// `in_flight` so shutdown can wait for them.
    pub fn new(
        publisher: Arc<dyn OrderPublisher>,
        topic: impl Into<String>,
        runtime: Handle,
        in_flight: TaskTracker,
    ) -> Self {
        Self {
            publisher,
            topic: topic.into(),
            runtime,
            in_flight,
        }
    }

    pub fn send_order(
        &self,
        order_id: &str,
        product: &str,
        price: f64,
    ) -> Result<JoinHandle<()>, RejectedOrder> {
        if order_id.trim().is_empty() {
            tracing::warn!("Skipping publish: orderId is empty");
            return Err(RejectedOrder::MissingOrderId);
        }
        if product.trim().is_empty() {
            tracing::warn!(order_id = %order_id, "Skipping publish: product name is empty");
            return Err(RejectedOrder::MissingProduct);
        }
        if !(price > 0.0 && price.is_finite()) {
            tracing::warn!(order_id = %order_id, price, "Skipping publish: price must be > 0");
            return Err(RejectedOrder::NonPositivePrice);
        }

        let order = Order::new(order_id, product, price);
        let publisher = self.publisher.clone();
        let topic = self.topic.clone();

        let publish = async move {
            match publisher.publish(&topic, &order, &MessageHeaders::default()).await {
                Ok(()) => tracing::info!(
                    order_id = %order.order_id,
                    topic = %topic,
                    "Order published"
                ),
                Err(e) => tracing::error!(
                    order_id = %order.order_id,
                    error = %e,
                    "Failed to publish order"
                ),
            }
        };

        Ok(self.in_flight.spawn_on(publish, &self.runtime))
    }
}
