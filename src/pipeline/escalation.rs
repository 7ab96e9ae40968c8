use std::fmt;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;

use super::delivery::{MessageHeaders, RetryContext};
use crate::config::TopicConfig;
use crate::domain::order::Order;
use crate::messaging::OrderPublisher;
use crate::metrics::Metrics;

// ============================================================================
// Retry Escalation Controller
// ============================================================================
//
// Decides, for one processing failure, between another trip through the
// retry topic and the dead letter topic:
//
//   next = retry_count + 1
//   next <  max_retry_attempts  -> publish to retry topic, header = next
//   next >= max_retry_attempts  -> publish to DLQ, retry_count = next
//
// A failed retry publish falls back once to the DLQ. The decision is made
// synchronously; the publish runs in a task on the shared in-flight tracker so
// the caller can acknowledge its message without waiting on the broker, and
// shutdown can still wait for every routing to land.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadLetterReason {
    MaxRetriesExceeded,
    RetryPublishFailed,
}

impl DeadLetterReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeadLetterReason::MaxRetriesExceeded => "max retry attempts exceeded",
            DeadLetterReason::RetryPublishFailed => "failed to publish to retry stream",
        }
    }
}

impl fmt::Display for DeadLetterReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a failed order is headed, known before any publish happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingDecision {
    Retry { retry_count: u32 },
    DeadLetter { retry_count: u32, reason: DeadLetterReason },
}

/// Where a failed order actually ended up once the publish completed.
#[derive(Debug, Clone, PartialEq)]
pub enum RoutingOutcome {
    RetryPublished { retry_count: u32 },
    DeadLettered { retry_count: u32, reason: DeadLetterReason },
    /// The DLQ publish itself failed; the order survives only in the logs.
    Lost { retry_count: u32, reason: DeadLetterReason, error: String },
}

pub struct Escalation {
    pub decision: RoutingDecision,
    /// Completion of the asynchronous publish. Dropping it detaches the task;
    /// the in-flight tracker still sees it.
    pub completion: JoinHandle<RoutingOutcome>,
}

#[derive(Clone)]
pub struct RetryEscalation {
    publisher: Arc<dyn OrderPublisher>,
    retry_topic: String,
    dead_letter_topic: String,
    metrics: Arc<Metrics>,
    in_flight: TaskTracker,
}

impl RetryEscalation {
    pub fn new(
        publisher: Arc<dyn OrderPublisher>,
        topics: &TopicConfig,
        metrics: Arc<Metrics>,
        in_flight: TaskTracker,
    ) -> Self {
        Self {
            publisher,
            retry_topic: topics.retry.clone(),
            dead_letter_topic: topics.dead_letter.clone(),
            metrics,
            in_flight,
        }
    }

    pub fn decide(ctx: &RetryContext) -> RoutingDecision {
        let retry_count = ctx.next_retry_count();
        if retry_count < ctx.max_retry_attempts {
            RoutingDecision::Retry { retry_count }
        } else {
            RoutingDecision::DeadLetter {
                retry_count,
                reason: DeadLetterReason::MaxRetriesExceeded,
            }
        }
    }

    /// Route one failure. Must be called from within a tokio runtime.
    pub fn escalate(&self, ctx: RetryContext, failure: &str) -> Escalation {
        let decision = Self::decide(&ctx);
        let order_id = ctx.order.order_id.clone();

        match decision {
            RoutingDecision::Retry { retry_count } => {
                tracing::warn!(
                    order_id = %order_id,
                    attempt = retry_count,
                    max_attempts = ctx.max_retry_attempts,
                    delay_ms = ctx.retry_delay.as_millis() as u64,
                    error = %failure,
                    "Retrying order"
                );
            }
            RoutingDecision::DeadLetter { retry_count, reason } => {
                tracing::error!(
                    order_id = %order_id,
                    retry_count,
                    reason = %reason,
                    error = %failure,
                    "Maximum retries exceeded, sending to DLQ"
                );
            }
        }

        let router = self.clone();
        let failure = failure.to_string();
        let completion = self
            .in_flight
            .spawn(async move { router.route(ctx.order, decision, failure).await });

        Escalation { decision, completion }
    }

    async fn route(&self, order: Order, decision: RoutingDecision, failure: String) -> RoutingOutcome {
        match decision {
            RoutingDecision::Retry { retry_count } => {
                let headers = MessageHeaders {
                    retry_count: Some(retry_count),
                    ..Default::default()
                };

                match self.publisher.publish(&self.retry_topic, &order, &headers).await {
                    Ok(()) => {
                        self.metrics.record_retry_published(retry_count);
                        tracing::debug!(
                            order_id = %order.order_id,
                            retry_count,
                            "Order published to retry stream"
                        );
                        RoutingOutcome::RetryPublished { retry_count }
                    }
                    Err(e) => {
                        tracing::error!(
                            order_id = %order.order_id,
                            error = %e,
                            "Failed to publish to retry stream"
                        );
                        self.dead_letter(&order, retry_count, DeadLetterReason::RetryPublishFailed, failure)
                            .await
                    }
                }
            }
            RoutingDecision::DeadLetter { retry_count, reason } => {
                self.dead_letter(&order, retry_count, reason, failure).await
            }
        }
    }

    async fn dead_letter(
        &self,
        order: &Order,
        retry_count: u32,
        reason: DeadLetterReason,
        failure: String,
    ) -> RoutingOutcome {
        tracing::error!(
            order_id = %order.order_id,
            reason = %reason,
            retries = retry_count,
            "Sending order to DLQ"
        );

        let headers = MessageHeaders {
            retry_count: Some(retry_count),
            dead_letter_reason: Some(reason.to_string()),
            failure_detail: Some(failure),
        };

        match self.publisher.publish(&self.dead_letter_topic, order, &headers).await {
            Ok(()) => {
                self.metrics.record_dlq_routed(reason.as_str());
                tracing::info!(order_id = %order.order_id, "Order sent to DLQ successfully");
                RoutingOutcome::DeadLettered { retry_count, reason }
            }
            Err(e) => {
                tracing::error!(
                    order_id = %order.order_id,
                    product = %order.product,
                    price = order.price,
                    error = %e,
                    "Failed to send order to DLQ"
                );
                RoutingOutcome::Lost {
                    retry_count,
                    reason,
                    error: e.to_string(),
                }
            }
        }
    }
}
