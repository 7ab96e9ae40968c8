use std::time::Duration;

use crate::config::RetryPolicy;
use crate::domain::order::Order;

// ============================================================================
// Delivery Contract
// ============================================================================
//
// What the pipeline needs from the broker for each consumed message: the
// decoded order, its source coordinates, the metadata headers, and a handle
// that acknowledges the message exactly once.
//
// ============================================================================

/// Signals that a consumed message has been handled and must not be
/// redelivered. Taking `self` by value makes a second acknowledgment of the
/// same message impossible.
pub trait Acknowledgment {
    fn acknowledge(self);
}

/// Metadata carried in message headers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageHeaders {
    pub retry_count: Option<u32>,
    pub dead_letter_reason: Option<String>,
    pub failure_detail: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Delivery {
    pub order: Order,
    pub partition: i32,
    pub offset: i64,
    pub headers: MessageHeaders,
}

impl Delivery {
    pub fn new(order: Order, partition: i32, offset: i64) -> Self {
        Self {
            order,
            partition,
            offset,
            headers: MessageHeaders::default(),
        }
    }

    pub fn with_headers(mut self, headers: MessageHeaders) -> Self {
        self.headers = headers;
        self
    }

    /// Attempts already made for this order; an absent header counts as 0.
    pub fn retry_count(&self) -> u32 {
        self.headers.retry_count.unwrap_or(0)
    }
}

/// Escalation state for one failed order, owned by whichever handling path
/// currently holds the message.
#[derive(Debug, Clone)]
pub struct RetryContext {
    pub order: Order,
    pub retry_count: u32,
    pub max_retry_attempts: u32,
    pub retry_delay: Duration,
}

impl RetryContext {
    pub fn new(order: Order, retry_count: u32, policy: &RetryPolicy) -> Self {
        Self {
            order,
            retry_count,
            max_retry_attempts: policy.max_attempts,
            retry_delay: policy.delay,
        }
    }

    /// Count the next escalation will carry. Saturates rather than wrapping on
    /// a hostile header value.
    pub fn next_retry_count(&self) -> u32 {
        self.retry_count.saturating_add(1)
    }
}
