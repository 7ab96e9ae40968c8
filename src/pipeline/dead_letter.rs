use std::sync::Arc;

use super::archive::DeadLetterArchive;
use super::delivery::{Acknowledgment, Delivery};
use crate::domain::order::FailedOrderRecord;
use crate::metrics::Metrics;

// ============================================================================
// Dead Letter Consumer
// ============================================================================
//
// Terminal stop for orders that exhausted their retries. Each delivery is
// captured into the archive with its DLQ coordinates and acknowledged; there
// is no further routing from here.
//
// ============================================================================

pub struct DeadLetterHandler {
    archive: Arc<DeadLetterArchive>,
    metrics: Arc<Metrics>,
}

impl DeadLetterHandler {
    pub fn new(archive: Arc<DeadLetterArchive>, metrics: Arc<Metrics>) -> Self {
        Self { archive, metrics }
    }

    pub async fn handle<A: Acknowledgment>(&self, delivery: Delivery, ack: A) -> FailedOrderRecord {
        let record = FailedOrderRecord::capture(&delivery.order, delivery.partition, delivery.offset)
            .with_retry_count(delivery.headers.retry_count)
            .with_reason(delivery.headers.dead_letter_reason.clone());

        tracing::error!(
            record_id = %record.id,
            timestamp = %record.timestamp.format("%Y-%m-%d %H:%M:%S"),
            order_id = %record.order_id,
            product = %record.product,
            price = record.price,
            partition = record.partition,
            offset = record.offset,
            retry_count = ?record.retry_count,
            reason = ?record.reason,
            error = ?delivery.headers.failure_detail,
            "💀 Dead letter message received"
        );

        self.archive.append(record.clone());
        self.metrics.record_dlq_received();

        ack.acknowledge();
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::Order;
    use crate::pipeline::testing::CountingAck;
    use crate::pipeline::MessageHeaders;

    fn handler() -> (DeadLetterHandler, Arc<DeadLetterArchive>) {
        let archive = Arc::new(DeadLetterArchive::new());
        let handler = DeadLetterHandler::new(archive.clone(), Arc::new(Metrics::new().unwrap()));
        (handler, archive)
    }

    #[tokio::test]
    async fn test_dead_letter_record_keeps_source_coordinates() {
        let (handler, archive) = handler();
        let ack = CountingAck::new();

        let delivery = Delivery::new(Order::new("ORD-1", "Widget", 9.99), 2, 100);
        handler.handle(delivery, ack.clone()).await;

        assert_eq!(ack.count(), 1);
        let records = archive.list();
        assert_eq!(records.len(), 1);

        let record = &records[0];
        assert_eq!(record.order_id, "ORD-1");
        assert_eq!(record.product, "Widget");
        assert_eq!(record.price, 9.99);
        assert_eq!(record.partition, 2);
        assert_eq!(record.offset, 100);
        assert!(record.timestamp <= chrono::Utc::now());
    }

    #[tokio::test]
    async fn test_dead_letter_headers_are_captured() {
        let (handler, _archive) = handler();

        let delivery = Delivery::new(Order::new("ORD-2", "Gadget", 0.0), 0, 3).with_headers(
            MessageHeaders {
                retry_count: Some(3),
                dead_letter_reason: Some("max retry attempts exceeded".to_string()),
                failure_detail: None,
            },
        );
        let record = handler.handle(delivery, CountingAck::new()).await;

        assert_eq!(record.retry_count, Some(3));
        assert_eq!(record.reason.as_deref(), Some("max retry attempts exceeded"));
    }

    #[tokio::test]
    async fn test_invalid_orders_are_archived_as_is() {
        // The DLQ path never re-validates
        let (handler, archive) = handler();
        handler
            .handle(Delivery::new(Order::default(), 0, 0), CountingAck::new())
            .await;

        assert_eq!(archive.count(), 1);
    }
}
