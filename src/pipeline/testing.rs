use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::delivery::{Acknowledgment, MessageHeaders};
use crate::config::TopicConfig;
use crate::domain::order::Order;
use crate::messaging::{OrderPublisher, PublishError};

// In-memory doubles for the broker side of the pipeline.

pub fn test_topics() -> TopicConfig {
    TopicConfig {
        orders: "orders".to_string(),
        retry: "orders-retry".to_string(),
        dead_letter: "orders-dlq".to_string(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Published {
    pub topic: String,
    pub order: Order,
    pub headers: MessageHeaders,
}

#[derive(Default)]
pub struct RecordingPublisher {
    published: Mutex<Vec<Published>>,
    failing_topics: Mutex<HashSet<String>>,
    latency: Option<Duration>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every publish takes `latency` before it lands.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::default()
        }
    }

    pub fn fail_topic(&self, topic: &str) {
        self.failing_topics.lock().insert(topic.to_string());
    }

    pub fn published(&self) -> Vec<Published> {
        self.published.lock().clone()
    }
}

#[async_trait]
impl OrderPublisher for RecordingPublisher {
    async fn publish(
        &self,
        topic: &str,
        order: &Order,
        headers: &MessageHeaders,
    ) -> Result<(), PublishError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if self.failing_topics.lock().contains(topic) {
            return Err(PublishError::Broker(format!("{topic} unavailable")));
        }

        self.published.lock().push(Published {
            topic: topic.to_string(),
            order: order.clone(),
            headers: headers.clone(),
        });
        Ok(())
    }
}

/// Acknowledgment handle that counts how often it was used.
#[derive(Clone, Default)]
pub struct CountingAck(Arc<AtomicUsize>);

impl CountingAck {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

impl Acknowledgment for CountingAck {
    fn acknowledge(self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}
