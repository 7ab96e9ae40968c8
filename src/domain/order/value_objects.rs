use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::OrderError;

// ============================================================================
// Order Value Objects
// ============================================================================

/// An order event as it travels through the `orders`, `orders-retry` and
/// `orders-dlq` topics.
///
/// Missing JSON keys decode to empty values so that an incomplete payload is
/// routed through validation (and eventually the DLQ) instead of being
/// dropped as undecodable.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Order {
    pub order_id: String,
    pub product: String,
    pub price: f64,
}

impl Order {
    pub fn new(order_id: impl Into<String>, product: impl Into<String>, price: f64) -> Self {
        Self {
            order_id: order_id.into(),
            product: product.into(),
            price,
        }
    }

    /// Business rules an order must satisfy before it may touch the
    /// aggregator or be forwarded anywhere.
    pub fn validate(&self) -> Result<(), OrderError> {
        if self.order_id.trim().is_empty() {
            return Err(OrderError::MissingOrderId);
        }
        if self.product.trim().is_empty() {
            return Err(OrderError::MissingProduct);
        }
        // Also rejects NaN and infinities, which would poison the running sum
        if !(self.price > 0.0 && self.price.is_finite()) {
            return Err(OrderError::InvalidPrice(self.price));
        }
        Ok(())
    }
}

/// A dead-lettered order as captured by the DLQ consumer.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FailedOrderRecord {
    pub id: Uuid,
    pub order_id: String,
    pub product: String,
    pub price: f64,
    pub timestamp: DateTime<Utc>,
    pub partition: i32,
    pub offset: i64,
    pub retry_count: Option<u32>,
    pub reason: Option<String>,
}

impl FailedOrderRecord {
    pub fn capture(order: &Order, partition: i32, offset: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id: order.order_id.clone(),
            product: order.product.clone(),
            price: order.price,
            timestamp: Utc::now(),
            partition,
            offset,
            retry_count: None,
            reason: None,
        }
    }

    pub fn with_retry_count(mut self, retry_count: Option<u32>) -> Self {
        self.retry_count = retry_count;
        self
    }

    pub fn with_reason(mut self, reason: Option<String>) -> Self {
        self.reason = reason;
        self
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_order_passes() {
        let order = Order::new("ORD-1", "Widget", 9.99);
        assert!(order.validate().is_ok());
    }

    #[test]
    fn test_blank_fields_are_rejected() {
        assert_eq!(
            Order::new("  ", "Widget", 1.0).validate(),
            Err(OrderError::MissingOrderId)
        );
        assert_eq!(
            Order::new("ORD-1", "", 1.0).validate(),
            Err(OrderError::MissingProduct)
        );
    }

    #[test]
    fn test_non_positive_and_non_finite_prices_are_rejected() {
        for price in [0.0, -3.5, f64::NAN, f64::INFINITY] {
            let result = Order::new("ORD-1", "Widget", price).validate();
            assert!(matches!(result, Err(OrderError::InvalidPrice(_))), "price {price}");
        }
    }

    #[test]
    fn test_order_id_checked_first() {
        // All three fields invalid: the first rule reports
        let order = Order::new("", "", -1.0);
        assert_eq!(order.validate(), Err(OrderError::MissingOrderId));
    }

    #[test]
    fn test_order_wire_format_is_camel_case() {
        let json = serde_json::to_value(Order::new("ORD-7", "Gadget", 12.5)).unwrap();
        assert_eq!(json["orderId"], "ORD-7");
        assert_eq!(json["product"], "Gadget");
        assert_eq!(json["price"], 12.5);
    }

    #[test]
    fn test_missing_keys_decode_as_invalid_order() {
        let order: Order = serde_json::from_str(r#"{"product":"Widget"}"#).unwrap();
        assert_eq!(order.order_id, "");
        assert_eq!(order.price, 0.0);
        assert_eq!(order.validate(), Err(OrderError::MissingOrderId));
    }

    #[test]
    fn test_failed_order_record_capture() {
        let order = Order::new("ORD-1", "Widget", 9.99);
        let record = FailedOrderRecord::capture(&order, 2, 100)
            .with_retry_count(Some(3))
            .with_reason(Some("max retry attempts exceeded".to_string()));

        assert_eq!(record.order_id, "ORD-1");
        assert_eq!(record.product, "Widget");
        assert_eq!(record.price, 9.99);
        assert_eq!(record.partition, 2);
        assert_eq!(record.offset, 100);
        assert_eq!(record.retry_count, Some(3));
        assert!(record.timestamp <= Utc::now());
    }
}
