//! Scheduler configuration

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Number of worker slots in the pool
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Upper bound on how long an idle worker parks before rechecking
    /// the queue for tasks whose dependencies completed meanwhile
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Advisory per-category concurrency limits
    ///
    /// Reported in stats and logged when exceeded; never enforced at
    /// dispatch.
    #[serde(default)]
    pub category_limits: HashMap<String, usize>,
}

fn default_worker_count() -> usize {
    4
}

fn default_poll_interval_ms() -> u64 {
    50
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            worker_count: 4,
            poll_interval_ms: 50,
            category_limits: HashMap::new(),
        }
    }
}

impl SchedulerConfig {
    /// Get the idle poll interval as a Duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
