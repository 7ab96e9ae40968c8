use rdkafka::message::{Header, Headers, OwnedHeaders};

use crate::pipeline::MessageHeaders;

// ============================================================================
// Message Header Codec
// ============================================================================

pub const RETRY_COUNT: &str = "retry-count";
pub const DLQ_REASON: &str = "dlq-reason";
pub const DLQ_ERROR: &str = "dlq-error";

pub fn to_kafka(headers: &MessageHeaders) -> OwnedHeaders {
    let mut owned = OwnedHeaders::new();

    if let Some(count) = headers.retry_count {
        let count = count.to_string();
        owned = owned.insert(Header {
            key: RETRY_COUNT,
            value: Some(count.as_str()),
        });
    }
    if let Some(ref reason) = headers.dead_letter_reason {
        owned = owned.insert(Header {
            key: DLQ_REASON,
            value: Some(reason.as_str()),
        });
    }
    if let Some(ref detail) = headers.failure_detail {
        owned = owned.insert(Header {
            key: DLQ_ERROR,
            value: Some(detail.as_str()),
        });
    }

    owned
}

/// Decode the headers we understand. Unknown keys are ignored; a malformed
/// `retry-count` is treated as absent.
pub fn from_kafka<H: Headers>(headers: Option<&H>) -> MessageHeaders {
    let mut decoded = MessageHeaders::default();

    let Some(headers) = headers else {
        return decoded;
    };

    for header in headers.iter() {
        let Some(value) = header.value.and_then(|v| std::str::from_utf8(v).ok()) else {
            continue;
        };

        match header.key {
            RETRY_COUNT => match value.trim().parse::<u32>() {
                Ok(count) => decoded.retry_count = Some(count),
                Err(e) => {
                    tracing::warn!(value = %value, error = %e, "Ignoring malformed retry-count header");
                }
            },
            DLQ_REASON => decoded.dead_letter_reason = Some(value.to_string()),
            DLQ_ERROR => decoded.failure_detail = Some(value.to_string()),
            _ => {}
        }
    }

    decoded
}
