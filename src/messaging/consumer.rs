use kameo::actor::ActorRef;
use rdkafka::{
    config::ClientConfig,
    consumer::{CommitMode, Consumer, StreamConsumer},
    error::KafkaError,
    message::{BorrowedMessage, Message},
    Offset, TopicPartitionList,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use super::headers;
use crate::actors::{HealthMonitorActor, HealthStatus, UpdateHealth};
use crate::domain::order::Order;
use crate::metrics::Metrics;
use crate::pipeline::{Acknowledgment, Delivery, StreamKind};

// ============================================================================
// Stream Worker - one consumer-group member on one logical stream
// ============================================================================
//
// Each worker owns its own StreamConsumer and handles one message at a time.
// Auto-commit is off: a message is acknowledged by committing offset + 1 for
// its partition, which the handler does exactly once through `KafkaAck`.
//
// ============================================================================

const RECEIVE_ERROR_BACKOFF: Duration = Duration::from_secs(1);

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("message has no payload")]
    EmptyPayload,

    #[error("payload is not a valid order: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn decode_order(payload: Option<&[u8]>) -> Result<Order, DecodeError> {
    let payload = payload.ok_or(DecodeError::EmptyPayload)?;
    Ok(serde_json::from_slice(payload)?)
}

fn decode(message: &BorrowedMessage<'_>) -> Result<Delivery, DecodeError> {
    let order = decode_order(message.payload())?;
    Ok(Delivery::new(order, message.partition(), message.offset())
        .with_headers(headers::from_kafka(message.headers())))
}

/// Commits one consumed message.
pub struct KafkaAck {
    consumer: Arc<StreamConsumer>,
    topic: String,
    partition: i32,
    offset: i64,
}

impl Acknowledgment for KafkaAck {
    fn acknowledge(self) {
        let mut tpl = TopicPartitionList::new();
        let committed = tpl
            .add_partition_offset(&self.topic, self.partition, Offset::Offset(self.offset + 1))
            .and_then(|_| self.consumer.commit(&tpl, CommitMode::Async));

        match committed {
            Ok(()) => tracing::trace!(
                topic = %self.topic,
                partition = self.partition,
                offset = self.offset,
                "Message acknowledged"
            ),
            Err(e) => tracing::error!(
                topic = %self.topic,
                partition = self.partition,
                offset = self.offset,
                error = %e,
                "Failed to commit offset"
            ),
        }
    }
}

pub struct StreamWorker {
    consumer: Arc<StreamConsumer>,
    stream: StreamKind,
    worker_id: usize,
    metrics: Arc<Metrics>,
    health: ActorRef<HealthMonitorActor>,
}

impl StreamWorker {
    pub fn subscribe(
        brokers: &str,
        group_id: &str,
        topic: &str,
        stream: StreamKind,
        worker_id: usize,
        metrics: Arc<Metrics>,
        health: ActorRef<HealthMonitorActor>,
    ) -> Result<Self, KafkaError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("group.id", group_id)
            .set("client.id", format!("{}-worker-{}", stream.label(), worker_id))
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest")
            .set("session.timeout.ms", "10000")
            .create()?;

        consumer.subscribe(&[topic])?;

        tracing::info!(
            topic = %topic,
            group_id = %group_id,
            worker_id,
            "Consumer subscribed"
        );

        Ok(Self {
            consumer: Arc::new(consumer),
            stream,
            worker_id,
            metrics,
            health,
        })
    }

    fn component(&self) -> String {
        format!("{}-worker-{}", self.stream.label(), self.worker_id)
    }

    async fn report(&self, status: HealthStatus) {
        let _ = self.health.tell(UpdateHealth {
            component: self.component(),
            status,
            details: None,
        }).send().await;
    }

    /// Pull messages until `shutdown` flips, passing each decodable one to
    /// `handle` together with its acknowledgment handle.
    pub async fn run<F, Fut>(self, mut shutdown: watch::Receiver<bool>, mut handle: F)
    where
        F: FnMut(Delivery, KafkaAck) -> Fut,
        Fut: Future<Output = ()>,
    {
        self.report(HealthStatus::Healthy).await;
        let mut receive_health = ReceiveHealth::default();

        loop {
            if *shutdown.borrow() {
                break;
            }

            // The borrowed message must not outlive this block
            let next = {
                let received = tokio::select! {
                    _ = shutdown.changed() => break,
                    received = self.consumer.recv() => received,
                };

                match received {
                    Err(e) => Err(e),
                    Ok(message) => {
                        let ack = KafkaAck {
                            consumer: self.consumer.clone(),
                            topic: message.topic().to_string(),
                            partition: message.partition(),
                            offset: message.offset(),
                        };
                        Ok((decode(&message), ack))
                    }
                }
            };

            match next {
                Err(e) => {
                    tracing::error!(
                        stream = self.stream.label(),
                        worker_id = self.worker_id,
                        error = %e,
                        "Kafka receive error"
                    );
                    if let Some(status) = receive_health.on_error(&e) {
                        self.report(status).await;
                    }
                    tokio::time::sleep(RECEIVE_ERROR_BACKOFF).await;
                }
                Ok((decoded, ack)) => {
                    if let Some(status) = receive_health.on_message() {
                        self.report(status).await;
                    }
                    let position = (ack.partition, ack.offset);
                    dispatch(self.stream, decoded, position, ack, &self.metrics, &mut handle).await;
                }
            }
        }

        tracing::info!(
            stream = self.stream.label(),
            worker_id = self.worker_id,
            "Consumer worker stopped"
        );
    }
}

/// Health transitions of one worker's receive loop. Reports only on change.
#[derive(Debug)]
struct ReceiveHealth {
    healthy: bool,
}

impl Default for ReceiveHealth {
    fn default() -> Self {
        Self { healthy: true }
    }
}

impl ReceiveHealth {
    fn on_error(&mut self, error: &KafkaError) -> Option<HealthStatus> {
        if !self.healthy {
            return None;
        }
        self.healthy = false;
        Some(HealthStatus::Degraded(error.to_string()))
    }

    fn on_message(&mut self) -> Option<HealthStatus> {
        if self.healthy {
            return None;
        }
        self.healthy = true;
        Some(HealthStatus::Healthy)
    }
}

/// Route one received message. A decoded delivery goes to `handle`, which
/// then owns the acknowledgment; an undecodable one has no order to route, so
/// it is logged, counted and acknowledged here.
async fn dispatch<A, F, Fut>(
    stream: StreamKind,
    decoded: Result<Delivery, DecodeError>,
    (partition, offset): (i32, i64),
    ack: A,
    metrics: &Metrics,
    handle: &mut F,
) where
    A: Acknowledgment,
    F: FnMut(Delivery, A) -> Fut,
    Fut: Future<Output = ()>,
{
    match decoded {
        Ok(delivery) => handle(delivery, ack).await,
        Err(e) => {
            tracing::error!(
                stream = stream.label(),
                partition,
                offset,
                error = %e,
                "Dropping undecodable message"
            );
            metrics.record_undecodable(stream.label());
            ack.acknowledge();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testing::CountingAck;

    #[test]
    fn test_decode_order_payload() {
        let payload = br#"{"orderId":"ORD-1","product":"Widget","price":9.99}"#;
        let order = decode_order(Some(payload.as_slice())).unwrap();
        assert_eq!(order, Order::new("ORD-1", "Widget", 9.99));
    }

    #[test]
    fn test_missing_payload_is_undecodable() {
        assert!(matches!(decode_order(None), Err(DecodeError::EmptyPayload)));
    }

    #[test]
    fn test_garbage_payload_is_undecodable() {
        assert!(matches!(decode_order(Some(b"not json".as_slice())), Err(DecodeError::Json(_))));
    }

    #[test]
    fn test_partial_payload_decodes_for_validation() {
        let order = decode_order(Some(br#"{"orderId":"ORD-2"}"#.as_slice())).unwrap();
        assert!(order.validate().is_err());
    }

    fn dispatch_metrics() -> Metrics {
        Metrics::new().unwrap()
    }

    #[tokio::test]
    async fn test_undecodable_message_is_counted_and_acknowledged_once() {
        let metrics = dispatch_metrics();
        let ack = CountingAck::new();
        let mut handled = 0;

        let decoded = decode_order(Some(b"not json".as_slice()))
            .map(|order| Delivery::new(order, 0, 4));
        dispatch(
            StreamKind::Orders,
            decoded,
            (0, 4),
            ack.clone(),
            &metrics,
            &mut |_delivery: Delivery, _ack: CountingAck| {
                handled += 1;
                async {}
            },
        )
        .await;

        assert_eq!(handled, 0);
        assert_eq!(ack.count(), 1);

        let text = String::from_utf8(metrics.render().unwrap()).unwrap();
        assert!(text.contains(r#"undecodable_messages_total{stream="orders"} 1"#));
    }

    #[tokio::test]
    async fn test_decoded_message_is_left_to_the_handler() {
        let metrics = dispatch_metrics();
        let ack = CountingAck::new();
        let mut seen = Vec::new();

        let payload = br#"{"orderId":"ORD-1","product":"Widget","price":9.99}"#;
        let decoded = decode_order(Some(payload.as_slice()))
            .map(|order| Delivery::new(order, 1, 8));
        dispatch(
            StreamKind::Retry,
            decoded,
            (1, 8),
            ack.clone(),
            &metrics,
            &mut |delivery: Delivery, ack: CountingAck| {
                seen.push(delivery.order.order_id.clone());
                ack.acknowledge();
                async {}
            },
        )
        .await;

        assert_eq!(seen, vec!["ORD-1".to_string()]);
        // Only the handler's acknowledgment
        assert_eq!(ack.count(), 1);

        let text = String::from_utf8(metrics.render().unwrap()).unwrap();
        assert!(!text.contains("undecodable_messages_total{"));
    }

    #[test]
    fn test_receive_health_reports_only_transitions() {
        let mut health = ReceiveHealth::default();
        let error = KafkaError::NoMessageReceived;

        assert_eq!(health.on_message(), None);
        assert!(matches!(health.on_error(&error), Some(HealthStatus::Degraded(_))));
        assert_eq!(health.on_error(&error), None);
        assert_eq!(health.on_message(), Some(HealthStatus::Healthy));
        assert_eq!(health.on_message(), None);
    }
}
