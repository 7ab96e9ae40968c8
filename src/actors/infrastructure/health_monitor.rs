use kameo::prelude::*;
use kameo::actor::ActorRef;
use kameo::error::Infallible;
use kameo::message::{Context, Message};
use kameo::reply::{Reply, ReplyError};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use chrono::Utc;
use crate::messaging::RedpandaClient;
use crate::metrics::Metrics;
use crate::utils::CircuitState;
use crate::actors::core::{HealthStatus, ComponentHealth};

// ============================================================================
// Health Monitor Actor - Tracks pipeline component health
// ============================================================================
//
// Responsibilities:
// - Collect status reports from every consumer worker
// - Poll the producer's circuit breaker
// - Aggregate a system-wide status for the management API
//
// ============================================================================

const PRODUCER_COMPONENT: &str = "redpanda";
const PRODUCER_POLL_INTERVAL: Duration = Duration::from_secs(10);

// ============================================================================
// Messages
// ============================================================================

#[derive(Debug)]
pub struct UpdateHealth {
    pub component: String,
    pub status: HealthStatus,
    pub details: Option<String>,
}

#[derive(Debug)]
pub struct GetSystemHealth;

#[derive(Debug, Clone)]
pub struct SystemHealth {
    pub overall_status: HealthStatus,
    pub components: BTreeMap<String, ComponentHealth>,
    pub check_time: chrono::DateTime<Utc>,
}

impl Reply for SystemHealth {
    type Ok = Self;
    type Error = Infallible;
    type Value = Self;

    fn to_result(self) -> Result<Self, Infallible> {
        Ok(self)
    }

    fn into_any_err(self) -> Option<Box<dyn ReplyError>> {
        None
    }

    fn into_value(self) -> Self::Value {
        self
    }
}

// ============================================================================
// Health Monitor Actor
// ============================================================================

pub struct HealthMonitorActor {
    components: BTreeMap<String, ComponentHealth>,
    producer: Option<(Arc<RedpandaClient>, Arc<Metrics>)>,
}

impl HealthMonitorActor {
    pub fn new() -> Self {
        Self {
            components: BTreeMap::new(),
            producer: None,
        }
    }

    /// Also watch the producer's circuit breaker.
    pub fn with_producer(mut self, redpanda: Arc<RedpandaClient>, metrics: Arc<Metrics>) -> Self {
        self.producer = Some((redpanda, metrics));
        self
    }

    pub fn start(self) -> ActorRef<Self> {
        HealthMonitorActor::spawn(self)
    }

    fn compute_overall_status(&self) -> HealthStatus {
        let mut degraded = Vec::new();
        let mut unhealthy = Vec::new();

        for (name, health) in &self.components {
            match &health.status {
                HealthStatus::Unhealthy(msg) => unhealthy.push(format!("{}: {}", name, msg)),
                HealthStatus::Degraded(msg) => degraded.push(format!("{}: {}", name, msg)),
                HealthStatus::Healthy => {}
            }
        }

        if !unhealthy.is_empty() {
            HealthStatus::Unhealthy(unhealthy.join(", "))
        } else if !degraded.is_empty() {
            HealthStatus::Degraded(degraded.join(", "))
        } else {
            HealthStatus::Healthy
        }
    }
}

impl Default for HealthMonitorActor {
    fn default() -> Self {
        Self::new()
    }
}

impl Actor for HealthMonitorActor {
    type Args = Self;
    type Error = Infallible;

    async fn on_start(
        state: Self::Args,
        actor_ref: ActorRef<Self>
    ) -> Result<Self, Self::Error> {
        tracing::info!("HealthMonitorActor started");

        if let Some((redpanda, metrics)) = state.producer.clone() {
            let actor_ref = actor_ref.clone();

            tokio::spawn(async move {
                let mut interval = tokio::time::interval(PRODUCER_POLL_INTERVAL);
                loop {
                    interval.tick().await;

                    let circuit = redpanda.circuit_state();
                    metrics.update_circuit_breaker_state(circuit.as_gauge());

                    let status = match circuit {
                        CircuitState::Closed => HealthStatus::Healthy,
                        CircuitState::HalfOpen => {
                            HealthStatus::Degraded("Circuit breaker half-open".to_string())
                        }
                        CircuitState::Open => {
                            HealthStatus::Unhealthy("Circuit breaker open".to_string())
                        }
                    };

                    let sent = actor_ref.tell(UpdateHealth {
                        component: PRODUCER_COMPONENT.to_string(),
                        status,
                        details: None,
                    }).send().await;

                    // Monitor gone, nothing left to report to
                    if sent.is_err() {
                        break;
                    }
                }
            });
        }

        Ok(state)
    }
}

// ============================================================================
// Message Handlers
// ============================================================================

impl Message<UpdateHealth> for HealthMonitorActor {
    type Reply = ();

    async fn handle(&mut self, msg: UpdateHealth, _ctx: &mut Context<Self, Self::Reply>) -> Self::Reply {
        let previous = self.components.get(&msg.component).map(|h| h.status.clone());
        if previous.as_ref() != Some(&msg.status) {
            tracing::info!(
                component = %msg.component,
                status = ?msg.status,
                "Component health changed"
            );
        }

        let health = ComponentHealth {
            name: msg.component.clone(),
            status: msg.status,
            last_check: Utc::now(),
            details: msg.details,
        };

        self.components.insert(msg.component, health);
    }
}

impl Message<GetSystemHealth> for HealthMonitorActor {
    type Reply = SystemHealth;

    async fn handle(&mut self, _msg: GetSystemHealth, _ctx: &mut Context<Self, Self::Reply>) -> Self::Reply {
        SystemHealth {
            overall_status: self.compute_overall_status(),
            components: self.components.clone(),
            check_time: Utc::now(),
        }
    }
}
