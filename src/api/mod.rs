// Private module declarations
mod handlers;
mod server;

// ============================================================================
// Management API
// ============================================================================
//
// HTTP surface over the pipeline's shared state:
// - publish orders onto the main stream (single and batch)
// - read/reset price statistics
// - list/clear dead-lettered orders
// - health summary and Prometheus scrape endpoint
//
// ============================================================================

pub use server::{routes, serve, ApiState};
