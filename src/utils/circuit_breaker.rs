use parking_lot::Mutex;
use std::time::{Duration, Instant};

// ============================================================================
// Circuit Breaker
// ============================================================================
//
// Stops hammering the broker once publishes keep failing, so escalation falls
// through to its DLQ fallback immediately instead of waiting on timeouts.
//
// States:
// - Closed: publishes pass through
// - Open: publishes rejected until `open_for` has elapsed
// - HalfOpen: publishes allowed; `success_threshold` successes close the
//   circuit, any failure re-opens it
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    /// Gauge encoding used by the metrics registry.
    pub fn as_gauge(self) -> i64 {
        match self {
            CircuitState::Closed => 0,
            CircuitState::Open => 1,
            CircuitState::HalfOpen => 2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before opening
    pub failure_threshold: u32,
    /// How long the circuit stays open before probing
    pub open_for: Duration,
    /// Successes needed in half-open to close again
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            open_for: Duration::from_secs(30),
            success_threshold: 3,
        }
    }
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    consecutive_failures: u32,
    half_open_successes: u32,
    opened_at: Option<Instant>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("circuit breaker is open")]
pub struct CircuitOpen;

#[derive(Debug)]
pub struct CircuitBreaker {
    state: Mutex<BreakerState>,
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            state: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                half_open_successes: 0,
                opened_at: None,
            }),
            config,
        }
    }

    /// Ask permission for one call. Moves Open to HalfOpen once the open
    /// period has elapsed.
    pub fn try_acquire(&self) -> Result<(), CircuitOpen> {
        let mut state = self.state.lock();

        if state.state == CircuitState::Open {
            let elapsed = state.opened_at.map_or(true, |at| at.elapsed() >= self.config.open_for);
            if !elapsed {
                return Err(CircuitOpen);
            }
            tracing::info!("Circuit breaker transitioning to HalfOpen");
            state.state = CircuitState::HalfOpen;
            state.half_open_successes = 0;
        }

        Ok(())
    }

    pub fn record_success(&self) {
        let mut state = self.state.lock();

        match state.state {
            CircuitState::HalfOpen => {
                state.half_open_successes += 1;
                if state.half_open_successes >= self.config.success_threshold {
                    tracing::info!(
                        successes = state.half_open_successes,
                        "Circuit breaker closing"
                    );
                    state.state = CircuitState::Closed;
                    state.consecutive_failures = 0;
                    state.half_open_successes = 0;
                    state.opened_at = None;
                }
            }
            CircuitState::Closed => state.consecutive_failures = 0,
            CircuitState::Open => {}
        }
    }

    pub fn record_failure(&self) {
        let mut state = self.state.lock();
        state.consecutive_failures += 1;

        match state.state {
            CircuitState::Closed if state.consecutive_failures >= self.config.failure_threshold => {
                tracing::warn!(
                    failures = state.consecutive_failures,
                    "Circuit breaker opening"
                );
                state.state = CircuitState::Open;
                state.opened_at = Some(Instant::now());
            }
            CircuitState::HalfOpen => {
                tracing::warn!("Failure during half-open, reopening circuit");
                state.state = CircuitState::Open;
                state.half_open_successes = 0;
                state.opened_at = Some(Instant::now());
            }
            _ => {}
        }
    }

    pub fn state(&self) -> CircuitState {
        self.state.lock().state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(open_for: Duration) -> CircuitBreaker {
        CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 3,
            open_for,
            success_threshold: 2,
        })
    }

    #[test]
    fn test_opens_after_consecutive_failures() {
        let cb = breaker(Duration::from_secs(60));

        for _ in 0..3 {
            assert!(cb.try_acquire().is_ok());
            cb.record_failure();
        }

        assert_eq!(cb.state(), CircuitState::Open);
        assert_eq!(cb.try_acquire(), Err(CircuitOpen));
    }

    #[test]
    fn test_success_resets_failure_streak() {
        let cb = breaker(Duration::from_secs(60));

        cb.record_failure();
        cb.record_failure();
        cb.record_success();
        cb.record_failure();

        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn test_half_open_closes_after_successes() {
        let cb = breaker(Duration::from_millis(20));
        for _ in 0..3 {
            cb.record_failure();
        }

        std::thread::sleep(Duration::from_millis(40));

        assert!(cb.try_acquire().is_ok());
        assert_eq!(cb.state(), CircuitState::HalfOpen);

        cb.record_success();
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        cb.record_success();
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn test_half_open_failure_reopens() {
        let cb = breaker(Duration::from_millis(20));
        for _ in 0..3 {
            cb.record_failure();
        }

        std::thread::sleep(Duration::from_millis(40));
        assert!(cb.try_acquire().is_ok());
        cb.record_failure();

        assert_eq!(cb.state(), CircuitState::Open);
        assert_eq!(cb.try_acquire(), Err(CircuitOpen));
    }

    #[test]
    fn test_gauge_encoding() {
        assert_eq!(CircuitState::Closed.as_gauge(), 0);
        assert_eq!(CircuitState::Open.as_gauge(), 1);
        assert_eq!(CircuitState::HalfOpen.as_gauge(), 2);
    }
}
