//! Batch executor configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Batch executor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Max simultaneous work-function invocations
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Retries per item after the first attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay before the first retry
    #[serde(default = "default_base_retry_delay_ms")]
    pub base_retry_delay_ms: u64,

    /// Multiplier applied per further retry
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,

    /// Add uniform jitter of up to 10% to each backoff delay
    #[serde(default = "default_jitter")]
    pub jitter: bool,

    /// Per-item execution time bound
    #[serde(default = "default_item_timeout_ms")]
    pub item_timeout_ms: u64,

    /// Consecutive failures that open the circuit
    #[serde(default = "default_breaker_threshold")]
    pub breaker_threshold: u32,

    /// How long the circuit stays open before a probe is allowed
    #[serde(default = "default_breaker_open_ms")]
    pub breaker_open_ms: u64,

    /// Chunk size for batched processing
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Pause between chunks to bound burstiness
    #[serde(default = "default_batch_pause_ms")]
    pub batch_pause_ms: u64,
}

fn default_max_concurrent() -> usize {
    10
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_retry_delay_ms() -> u64 {
    200
}

fn default_backoff_factor() -> f64 {
    2.0
}

fn default_jitter() -> bool {
    true
}

fn default_item_timeout_ms() -> u64 {
    30_000
}

fn default_breaker_threshold() -> u32 {
    5
}

fn default_breaker_open_ms() -> u64 {
    30_000
}

fn default_batch_size() -> usize {
    50
}

fn default_batch_pause_ms() -> u64 {
    100
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 10,
            max_retries: 3,
            base_retry_delay_ms: 200,
            backoff_factor: 2.0,
            jitter: true,
            item_timeout_ms: 30_000,
            breaker_threshold: 5,
            breaker_open_ms: 30_000,
            batch_size: 50,
            batch_pause_ms: 100,
        }
    }
}

impl ExecutorConfig {
    /// Get the per-item timeout as a Duration
    pub fn item_timeout(&self) -> Duration {
        Duration::from_millis(self.item_timeout_ms)
    }

    /// Get the base retry delay as a Duration
    pub fn base_retry_delay(&self) -> Duration {
        Duration::from_millis(self.base_retry_delay_ms)
    }

    /// Get the breaker open window as a Duration
    pub fn breaker_open(&self) -> Duration {
        Duration::from_millis(self.breaker_open_ms)
    }

    /// Get the inter-chunk pause as a Duration
    pub fn batch_pause(&self) -> Duration {
        Duration::from_millis(self.batch_pause_ms)
    }
}
