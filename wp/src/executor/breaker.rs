//! Circuit breaker state machine
//!
//! Closed until `threshold` failures accumulate, then open: work is
//! short-circuited without invocation. Once the open window elapses the
//! breaker is half-open and admits exactly one probe; a probe success
//! closes it, a probe failure re-opens it with a fresh window.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Breaker states as seen by callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Normal operation
    Closed,
    /// Failure threshold reached, work is rejected
    Open,
    /// Open window elapsed, one probe may pass
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Open => write!(f, "open"),
            Self::HalfOpen => write!(f, "half_open"),
        }
    }
}

/// Circuit breaker shared across one executor instance
#[derive(Debug)]
pub struct CircuitBreaker {
    threshold: u32,
    open_duration: Duration,
    failure_count: u32,
    last_failure: Option<Instant>,
    probe_in_flight: bool,
}

impl CircuitBreaker {
    /// Create a closed breaker
    pub fn new(threshold: u32, open_duration: Duration) -> Self {
        Self {
            threshold: threshold.max(1),
            open_duration,
            failure_count: 0,
            last_failure: None,
            probe_in_flight: false,
        }
    }

    /// Current state, derived from the failure count and open window
    pub fn state(&self) -> CircuitState {
        if self.failure_count < self.threshold {
            return CircuitState::Closed;
        }
        match self.last_failure {
            Some(at) if at.elapsed() > self.open_duration => CircuitState::HalfOpen,
            _ => CircuitState::Open,
        }
    }

    /// Decide whether an invocation may proceed
    ///
    /// In the half-open state only the first caller gets through; everyone
    /// else is rejected until that probe reports back.
    pub fn check(&mut self) -> bool {
        match self.state() {
            CircuitState::Closed => true,
            CircuitState::Open => false,
            CircuitState::HalfOpen => {
                if self.probe_in_flight {
                    false
                } else {
                    debug!("CircuitBreaker::check: admitting half-open probe");
                    self.probe_in_flight = true;
                    true
                }
            }
        }
    }

    /// Record a successful invocation, closing the breaker
    pub fn record_success(&mut self) {
        if self.failure_count > 0 {
            debug!(failures = self.failure_count, "CircuitBreaker::record_success: resetting");
        }
        self.failure_count = 0;
        self.last_failure = None;
        self.probe_in_flight = false;
    }

    /// Record a failed invocation
    pub fn record_failure(&mut self) {
        self.failure_count += 1;
        self.last_failure = Some(Instant::now());
        self.probe_in_flight = false;
        if self.failure_count == self.threshold {
            warn!(failures = self.failure_count, "CircuitBreaker::record_failure: circuit opened");
        }
    }

    /// Failures accumulated since the last success
    pub fn failure_count(&self) -> u32 {
        self.failure_count
    }
}
