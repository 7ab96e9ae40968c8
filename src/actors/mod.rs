// ============================================================================
// Actors Module
// ============================================================================
//
// Actor-based infrastructure concerns.
//
// Structure:
// - core/           - Health status vocabulary
// - infrastructure/ - Concrete infrastructure actors (health monitor)
//
// Note: order processing itself runs in plain consumer tasks, not actors.
//
// ============================================================================

mod core;
mod infrastructure;

pub use self::core::HealthStatus;
pub use infrastructure::{HealthMonitorActor, UpdateHealth, GetSystemHealth};
