use std::sync::Arc;
use std::time::Instant;

use super::delivery::{Acknowledgment, Delivery, RetryContext};
use super::escalation::{Escalation, RetryEscalation};
use super::StreamKind;
use crate::analytics::{AggregationError, AggregationStats, PriceAnalytics};
use crate::config::RetryPolicy;
use crate::domain::order::{Order, OrderError};
use crate::metrics::Metrics;

// ============================================================================
// Order Processor - primary and retry consumption paths
// ============================================================================
//
// Both paths run the same validate-then-aggregate step. A failure is never
// propagated to the broker: it becomes a routing decision handed to the
// escalation controller, and the original message is acknowledged either way.
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error(transparent)]
    Validation(#[from] OrderError),

    #[error(transparent)]
    Aggregation(#[from] AggregationError),
}

impl ProcessingError {
    fn label(&self) -> &'static str {
        match self {
            ProcessingError::Validation(_) => "validation",
            ProcessingError::Aggregation(_) => "aggregation",
        }
    }
}

pub enum ProcessOutcome {
    Processed(AggregationStats),
    Escalated(Escalation),
}

pub struct OrderProcessor {
    analytics: Arc<PriceAnalytics>,
    escalation: RetryEscalation,
    policy: RetryPolicy,
    metrics: Arc<Metrics>,
}

impl OrderProcessor {
    pub fn new(
        analytics: Arc<PriceAnalytics>,
        escalation: RetryEscalation,
        policy: RetryPolicy,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            analytics,
            escalation,
            policy,
            metrics,
        }
    }

    /// Handle an order from the main stream.
    pub async fn handle_primary<A: Acknowledgment>(&self, delivery: Delivery, ack: A) -> ProcessOutcome {
        tracing::info!(
            order_id = %delivery.order.order_id,
            product = %delivery.order.product,
            price = delivery.order.price,
            partition = delivery.partition,
            offset = delivery.offset,
            "Received order"
        );

        self.attempt(StreamKind::Orders, delivery, 0, ack)
    }

    /// Handle an order from the retry stream, after the configured backoff.
    pub async fn handle_retry<A: Acknowledgment>(&self, delivery: Delivery, ack: A) -> ProcessOutcome {
        let retry_count = delivery.retry_count();
        let order_id = delivery.order.order_id.clone();

        tracing::info!(
            order_id = %order_id,
            retry_count,
            partition = delivery.partition,
            offset = delivery.offset,
            delay_ms = self.policy.delay.as_millis() as u64,
            "Retry attempt"
        );

        // Occupies this worker for the whole delay
        tokio::time::sleep(self.policy.delay).await;

        let outcome = self.attempt(StreamKind::Retry, delivery, retry_count, ack);
        if let ProcessOutcome::Processed(_) = outcome {
            tracing::info!(order_id = %order_id, retry_count, "Order recovered after retries");
        }
        outcome
    }

    fn attempt<A: Acknowledgment>(
        &self,
        stream: StreamKind,
        delivery: Delivery,
        retry_count: u32,
        ack: A,
    ) -> ProcessOutcome {
        let started = Instant::now();

        match self.process(&delivery.order) {
            Ok(stats) => {
                ack.acknowledge();
                self.metrics
                    .record_processed(stream.label(), started.elapsed().as_secs_f64());
                tracing::info!(
                    order_id = %delivery.order.order_id,
                    stream = stream.label(),
                    "Order processed successfully"
                );
                ProcessOutcome::Processed(stats)
            }
            Err(e) => {
                tracing::error!(
                    order_id = %delivery.order.order_id,
                    product = %delivery.order.product,
                    price = delivery.order.price,
                    partition = delivery.partition,
                    offset = delivery.offset,
                    retry_count,
                    stream = stream.label(),
                    error = %e,
                    "Error processing order, escalating"
                );
                self.metrics
                    .record_failed(stream.label(), e.label(), started.elapsed().as_secs_f64());

                let ctx = RetryContext::new(delivery.order, retry_count, &self.policy);
                let escalation = self.escalation.escalate(ctx, &e.to_string());

                // Responsibility now lies with the retry or dead letter stream
                ack.acknowledge();
                ProcessOutcome::Escalated(escalation)
            }
        }
    }

    fn process(&self, order: &Order) -> Result<AggregationStats, ProcessingError> {
        tracing::debug!(
            order_id = %order.order_id,
            product = %order.product,
            price = order.price,
            "Validating order"
        );

        order.validate()?;
        Ok(self.analytics.add_price(order.price)?)
    }
}
