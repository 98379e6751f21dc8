use crate::config::BreakerConfig;
use crate::types::CircuitBreakerState;
use tracing::{info, warn};

/// Decides circuit-breaker transitions; telemetry only records the result.
pub trait BreakerPolicy: Send + Sync {
    /// Called when a new run asks to dispatch while the breaker may be open.
    fn on_probe(&mut self, current: CircuitBreakerState) -> CircuitBreakerState;

    /// Called after every phase with that phase's dispatch counts.
    fn on_phase(
        &mut self,
        current: CircuitBreakerState,
        attempts: usize,
        failures: usize,
    ) -> CircuitBreakerState;
}

/// Trips when a phase's failure ratio reaches a threshold.
///
/// `CLOSED -> OPEN` once `failures / attempts >= threshold` over at least
/// `min_samples` dispatches; `OPEN -> HALF_OPEN` on the next probe;
/// `HALF_OPEN -> CLOSED` after `probation_successes` clean phases, and back
/// to `OPEN` on any failure.
#[derive(Debug, Clone)]
pub struct FailureRatePolicy {
    threshold: f64,
    min_samples: usize,
    probation_successes: u32,
    clean_phases: u32,
}

impl FailureRatePolicy {
    pub fn new(threshold: f64, min_samples: usize, probation_successes: u32) -> Self {
        Self {
            threshold,
            min_samples,
            probation_successes: probation_successes.max(1),
            clean_phases: 0,
        }
    }

    pub fn from_config(config: &BreakerConfig) -> Self {
        Self::new(
            config.failure_rate_threshold,
            config.min_samples,
            config.probation_successes,
        )
    }
}

impl Default for FailureRatePolicy {
    fn default() -> Self {
        Self::from_config(&BreakerConfig::default())
    }
}

impl BreakerPolicy for FailureRatePolicy {
    fn on_probe(&mut self, current: CircuitBreakerState) -> CircuitBreakerState {
        if current == CircuitBreakerState::Open {
            info!("Breaker probe: entering probation");
            self.clean_phases = 0;
            CircuitBreakerState::HalfOpen
        } else {
            current
        }
    }

    fn on_phase(
        &mut self,
        current: CircuitBreakerState,
        attempts: usize,
        failures: usize,
    ) -> CircuitBreakerState {
        match current {
            CircuitBreakerState::Closed => {
                if attempts == 0 || attempts < self.min_samples {
                    return CircuitBreakerState::Closed;
                }
                let rate = failures as f64 / attempts as f64;
                if rate >= self.threshold {
                    warn!(attempts, failures, rate, threshold = self.threshold, "Failure rate tripped breaker");
                    CircuitBreakerState::Open
                } else {
                    CircuitBreakerState::Closed
                }
            }
            CircuitBreakerState::HalfOpen => {
                if failures > 0 {
                    warn!(failures, "Failure during probation, reopening breaker");
                    self.clean_phases = 0;
                    return CircuitBreakerState::Open;
                }
                self.clean_phases += 1;
                if self.clean_phases >= self.probation_successes {
                    info!(clean_phases = self.clean_phases, "Probation passed, closing breaker");
                    self.clean_phases = 0;
                    CircuitBreakerState::Closed
                } else {
                    CircuitBreakerState::HalfOpen
                }
            }
            CircuitBreakerState::Open => CircuitBreakerState::Open,
        }
    }
}
