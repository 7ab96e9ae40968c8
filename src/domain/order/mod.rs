// ============================================================================
// Order Domain
// ============================================================================
//
// - Value objects (Order, FailedOrderRecord)
// - Errors (OrderError validation failures)
//
// ============================================================================

pub mod value_objects;
pub mod errors;

// Re-export for convenience
pub use value_objects::*;
pub use errors::*;
