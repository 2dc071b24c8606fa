//! Admission controller configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Admission controller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionConfig {
    /// Starting allowed rate (requests/second)
    #[serde(default = "default_initial_rate")]
    pub initial_rate: f64,

    /// Floor the adapted rate never drops below
    #[serde(default = "default_min_rate")]
    pub min_rate: f64,

    /// Ceiling the adapted rate never exceeds
    #[serde(default = "default_max_rate")]
    pub max_rate: f64,

    /// Token bucket capacity
    #[serde(default = "default_burst_capacity")]
    pub burst_capacity: f64,

    /// One-time emergency allowance for high-priority requests when the
    /// bucket is empty; replenished only by config reload
    #[serde(default = "default_high_priority_burst")]
    pub high_priority_burst: u32,

    /// Cap on each rolling history buffer
    #[serde(default = "default_rolling_window_size")]
    pub rolling_window_size: usize,

    /// Hysteresis band: a proposed rate change smaller than this fraction
    /// of the current rate is not applied
    #[serde(default = "default_adaptation_factor")]
    pub adaptation_factor: f64,

    /// Response time the adaptation treats as healthy (ms)
    #[serde(default = "default_target_response_ms")]
    pub target_response_ms: f64,

    /// Consecutive recorded errors before admission fail-fasts
    #[serde(default = "default_breaker_threshold")]
    pub breaker_threshold: u32,

    /// How long admission stays failed-fast after the last error
    #[serde(default = "default_breaker_cooldown_ms")]
    pub breaker_cooldown_ms: u64,

    /// Ascending load-band thresholds: medium, high, and critical start at
    /// indices 1..3; index 0 marks the top of the comfortable band
    #[serde(default = "default_load_thresholds")]
    pub load_thresholds: [f64; 4],
}

fn default_initial_rate() -> f64 {
    10.0
}

fn default_min_rate() -> f64 {
    1.0
}

fn default_max_rate() -> f64 {
    100.0
}

fn default_burst_capacity() -> f64 {
    20.0
}

fn default_high_priority_burst() -> u32 {
    5
}

fn default_rolling_window_size() -> usize {
    256
}

fn default_adaptation_factor() -> f64 {
    0.1
}

fn default_target_response_ms() -> f64 {
    1_000.0
}

fn default_breaker_threshold() -> u32 {
    10
}

fn default_breaker_cooldown_ms() -> u64 {
    5_000
}

fn default_load_thresholds() -> [f64; 4] {
    [0.25, 0.5, 0.75, 0.9]
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            initial_rate: 10.0,
            min_rate: 1.0,
            max_rate: 100.0,
            burst_capacity: 20.0,
            high_priority_burst: 5,
            rolling_window_size: 256,
            adaptation_factor: 0.1,
            target_response_ms: 1_000.0,
            breaker_threshold: 10,
            breaker_cooldown_ms: 5_000,
            load_thresholds: [0.25, 0.5, 0.75, 0.9],
        }
    }
}

impl AdmissionConfig {
    /// Get the breaker cooldown as a Duration
    pub fn breaker_cooldown(&self) -> Duration {
        Duration::from_millis(self.breaker_cooldown_ms)
    }
}
