// ============================================================================
// Failure-Escalation Pipeline
// ============================================================================
//
// Broker-independent core of the service:
// - delivery/    - what a consumed message looks like, acknowledgment contract
// - processor/   - primary and retry consumption paths
// - escalation/  - bounded retry controller and DLQ routing
// - dead_letter/ - DLQ consumption into the archive
// - archive/     - in-memory dead letter log
// - ingress/     - publishing new orders onto the main stream
//
// ============================================================================

mod archive;
mod dead_letter;
mod delivery;
mod escalation;
mod ingress;
mod processor;

#[cfg(test)]
pub(crate) mod testing;

pub use archive::DeadLetterArchive;
pub use dead_letter::DeadLetterHandler;
pub use delivery::{Acknowledgment, Delivery, MessageHeaders};
pub use escalation::RetryEscalation;
pub use ingress::OrderIngress;
pub use processor::OrderProcessor;

/// The three logical channels a worker can be attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Orders,
    Retry,
    DeadLetter,
}

impl StreamKind {
    /// Stable label for metrics and health components.
    pub fn label(&self) -> &'static str {
        match self {
            StreamKind::Orders => "orders",
            StreamKind::Retry => "orders-retry",
            StreamKind::DeadLetter => "orders-dlq",
        }
    }
}
