// ============================================================================
// Messaging - Redpanda/Kafka adapters
// ============================================================================
//
// - consumer/  - consumer-group workers feeding the pipeline
// - redpanda/  - producer behind a circuit breaker
// - headers/   - retry/DLQ metadata on the wire
// - publisher/ - the seam the pipeline publishes through
//
// ============================================================================

mod consumer;
mod headers;
mod publisher;
mod redpanda;

pub use consumer::StreamWorker;
pub use publisher::{OrderPublisher, PublishError};
pub use redpanda::RedpandaClient;
