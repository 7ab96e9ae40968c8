use chrono::{DateTime, Utc};

// ============================================================================
// Health Check Abstractions
// ============================================================================
//
// Status vocabulary shared by the consumer workers, the producer and the
// health monitor actor that aggregates them.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum HealthStatus {
    Healthy,
    Degraded(String),
    Unhealthy(String),
}

impl HealthStatus {
    /// Label reported by the HTTP health endpoint.
    pub fn label(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "UP",
            HealthStatus::Degraded(_) => "DEGRADED",
            HealthStatus::Unhealthy(_) => "DOWN",
        }
    }

    pub fn detail(&self) -> Option<&str> {
        match self {
            HealthStatus::Healthy => None,
            HealthStatus::Degraded(msg) | HealthStatus::Unhealthy(msg) => Some(msg),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ComponentHealth {
    pub name: String,
    pub status: HealthStatus,
    pub last_check: DateTime<Utc>,
    pub details: Option<String>,
}
