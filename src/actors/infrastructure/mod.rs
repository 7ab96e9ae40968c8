// ============================================================================
// Infrastructure Actors
// ============================================================================
//
// - Health monitoring
//
// ============================================================================

mod health_monitor;

pub use health_monitor::{HealthMonitorActor, UpdateHealth, GetSystemHealth};
