//! Bounded-concurrency batch execution
//!
//! Fans a list of work items out across a counting gate, applying per-item
//! timeout and exponential-backoff retry, with a circuit breaker shared
//! across the executor to protect the downstream dependency.

mod breaker;
mod config;
mod core;

pub use breaker::{CircuitBreaker, CircuitState};
pub use config::ExecutorConfig;
pub use core::{BatchExecutor, ExecutionResult, ExecutionStatus, ItemError, ProgressFn};
