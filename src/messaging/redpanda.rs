use async_trait::async_trait;
use rdkafka::{
    config::ClientConfig,
    error::KafkaError,
    producer::{FutureProducer, FutureRecord, Producer},
    util::Timeout,
};
use std::sync::Arc;
use std::time::Duration;

use super::headers;
use super::publisher::{OrderPublisher, PublishError};
use crate::domain::order::Order;
use crate::metrics::Metrics;
use crate::pipeline::MessageHeaders;
use crate::utils::{CircuitBreaker, CircuitBreakerConfig, CircuitState};

pub struct RedpandaClient {
    producer: FutureProducer,
    circuit_breaker: CircuitBreaker,
    send_timeout: Duration,
    metrics: Arc<Metrics>,
}

impl RedpandaClient {
    pub fn new(brokers: &str, send_timeout: Duration, metrics: Arc<Metrics>) -> Result<Self, KafkaError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", send_timeout.as_millis().to_string())
            .set("enable.idempotence", "true")
            .create()?;

        Ok(Self {
            producer,
            circuit_breaker: CircuitBreaker::new(CircuitBreakerConfig::default()),
            send_timeout,
            metrics,
        })
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.circuit_breaker.state()
    }

    /// Block until everything queued in the producer is delivered or `timeout`
    /// runs out.
    pub fn flush(&self, timeout: Duration) -> Result<(), KafkaError> {
        self.producer.flush(Timeout::After(timeout))
    }

    async fn send(
        &self,
        topic: &str,
        key: &str,
        payload: &[u8],
        headers: &MessageHeaders,
    ) -> Result<(), PublishError> {
        self.circuit_breaker.try_acquire().map_err(|_| {
            tracing::error!(topic = %topic, "Circuit breaker open - Redpanda unavailable");
            PublishError::CircuitOpen
        })?;

        let record = FutureRecord::to(topic)
            .key(key)
            .payload(payload)
            .headers(headers::to_kafka(headers));

        let result = self
            .producer
            .send(record, Timeout::After(self.send_timeout))
            .await;

        match result {
            Ok(_) => {
                self.circuit_breaker.record_success();
                tracing::debug!(topic = %topic, key = %key, "Published to Redpanda");
                Ok(())
            }
            Err((e, _)) => {
                self.circuit_breaker.record_failure();
                tracing::error!(error = %e, topic = %topic, key = %key, "Failed to publish to Redpanda");
                Err(PublishError::Broker(e.to_string()))
            }
        }
    }
}

#[async_trait]
impl OrderPublisher for RedpandaClient {
    async fn publish(
        &self,
        topic: &str,
        order: &Order,
        headers: &MessageHeaders,
    ) -> Result<(), PublishError> {
        let payload = serde_json::to_vec(order)?;
        let result = self.send(topic, &order.order_id, &payload, headers).await;

        if result.is_err() {
            self.metrics.record_publish_failure(topic);
        }
        self.metrics
            .update_circuit_breaker_state(self.circuit_breaker.state().as_gauge());

        result
    }
}
