// ============================================================================
// Domain Layer
// ============================================================================
//
// Order records and the business rules they must satisfy. Nothing in here
// knows about Kafka, HTTP or the retry machinery.
//
// ============================================================================

pub mod order;
