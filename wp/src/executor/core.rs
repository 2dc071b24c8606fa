//! Batch executor implementation

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, info, warn};

use crate::domain::WorkFn;

use super::breaker::{CircuitBreaker, CircuitState};
use super::config::ExecutorConfig;

/// Failure cause for a batch item
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ItemError {
    #[error("Work timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Circuit breaker is open")]
    CircuitOpen,

    #[error("{0}")]
    Failed(String),
}

/// Terminal status of a batch item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Completed,
    Failed,
}

/// Outcome of one work item
///
/// Immutable once produced; `process_all` returns one per submitted item,
/// in submission order.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// The originating item
    pub item: Value,
    pub status: ExecutionStatus,
    pub output: Option<Value>,
    pub error: Option<ItemError>,
    pub elapsed: Duration,
    /// Retries consumed (attempts made minus one)
    pub retry_count: u32,
    /// Caller-supplied context, carried through unchanged
    pub context: HashMap<String, Value>,
}

impl ExecutionResult {
    /// Check if the item completed successfully
    pub fn is_completed(&self) -> bool {
        self.status == ExecutionStatus::Completed
    }
}

/// Progress callback for batched processing: `(processed, total)`
pub type ProgressFn = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Bounded-concurrency fan-out engine with retry and circuit breaking
///
/// Stateless per call apart from the shared circuit breaker, which protects
/// the downstream dependency across every batch this executor runs.
pub struct BatchExecutor {
    config: ExecutorConfig,
    gate: Arc<Semaphore>,
    breaker: Arc<Mutex<CircuitBreaker>>,
}

impl BatchExecutor {
    /// Create an executor with the given configuration
    pub fn new(config: ExecutorConfig) -> Self {
        debug!(?config, "BatchExecutor::new: called");
        Self {
            gate: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
            breaker: Arc::new(Mutex::new(CircuitBreaker::new(
                config.breaker_threshold,
                config.breaker_open(),
            ))),
            config,
        }
    }

    /// Current breaker state (for metrics and tests)
    pub async fn breaker_state(&self) -> CircuitState {
        self.breaker.lock().await.state()
    }

    /// Process every item concurrently, bounded by the configured gate
    ///
    /// Synchronous from the caller's perspective: returns once every item
    /// reached a terminal state. Individual failures never propagate as
    /// panics or errors; they come back as `Failed` results.
    pub async fn process_all(
        &self,
        items: Vec<Value>,
        work: Arc<dyn WorkFn>,
        context: HashMap<String, Value>,
    ) -> Vec<ExecutionResult> {
        debug!(items = items.len(), "BatchExecutor::process_all: called");

        let mut handles = Vec::with_capacity(items.len());
        for item in &items {
            let item = item.clone();
            let work = Arc::clone(&work);
            let gate = Arc::clone(&self.gate);
            let breaker = Arc::clone(&self.breaker);
            let config = self.config.clone();
            let context = context.clone();
            handles.push(tokio::spawn(async move {
                process_item(item, work, gate, breaker, config, context).await
            }));
        }

        let mut results = Vec::with_capacity(items.len());
        for (item, joined) in items.into_iter().zip(join_all(handles).await) {
            match joined {
                Ok(result) => results.push(result),
                Err(e) => {
                    // A panicking work function is contained at the task
                    // boundary and reported like any other failure
                    warn!(error = %e, "BatchExecutor::process_all: item task panicked");
                    results.push(ExecutionResult {
                        item,
                        status: ExecutionStatus::Failed,
                        output: None,
                        error: Some(ItemError::Failed(format!("Work function panicked: {}", e))),
                        elapsed: Duration::ZERO,
                        retry_count: 0,
                        context: HashMap::new(),
                    });
                }
            }
        }
        results
    }

    /// Process items in sequential chunks of `batch_size`
    ///
    /// Results are concatenated in chunk order; the optional progress
    /// callback fires after each chunk and a short pause between chunks
    /// bounds burstiness toward the downstream dependency.
    pub async fn process_in_batches(
        &self,
        items: Vec<Value>,
        work: Arc<dyn WorkFn>,
        context: HashMap<String, Value>,
        progress: Option<ProgressFn>,
    ) -> Vec<ExecutionResult> {
        let total = items.len();
        let batch_size = self.config.batch_size.max(1);
        info!(total, batch_size, "BatchExecutor::process_in_batches: called");

        let mut results = Vec::with_capacity(total);
        let mut remaining = items;

        while !remaining.is_empty() {
            let rest = remaining.split_off(remaining.len().min(batch_size));
            let chunk = std::mem::replace(&mut remaining, rest);

            let chunk_results = self.process_all(chunk, Arc::clone(&work), context.clone()).await;
            results.extend(chunk_results);

            if let Some(progress) = &progress {
                progress(results.len(), total);
            }
            if !remaining.is_empty() && !self.config.batch_pause().is_zero() {
                tokio::time::sleep(self.config.batch_pause()).await;
            }
        }
        results
    }
}

/// Run one item to a terminal state: breaker check, gated invocation under
/// timeout, then backoff and retry while budget remains
async fn process_item(
    item: Value,
    work: Arc<dyn WorkFn>,
    gate: Arc<Semaphore>,
    breaker: Arc<Mutex<CircuitBreaker>>,
    config: ExecutorConfig,
    context: HashMap<String, Value>,
) -> ExecutionResult {
    let started = Instant::now();
    let mut attempt: u32 = 0;

    loop {
        if !breaker.lock().await.check() {
            debug!(attempt, "process_item: rejected by open circuit");
            return ExecutionResult {
                item,
                status: ExecutionStatus::Failed,
                output: None,
                error: Some(ItemError::CircuitOpen),
                elapsed: started.elapsed(),
                retry_count: attempt,
                context,
            };
        }

        let error = {
            let permit = gate.acquire().await;
            if permit.is_err() {
                // The gate only closes if the executor was torn down mid-call
                return ExecutionResult {
                    item,
                    status: ExecutionStatus::Failed,
                    output: None,
                    error: Some(ItemError::Failed("Executor gate closed".to_string())),
                    elapsed: started.elapsed(),
                    retry_count: attempt,
                    context,
                };
            }

            match tokio::time::timeout(config.item_timeout(), work.call(item.clone())).await {
                Ok(Ok(output)) => {
                    breaker.lock().await.record_success();
                    return ExecutionResult {
                        item,
                        status: ExecutionStatus::Completed,
                        output: Some(output),
                        error: None,
                        elapsed: started.elapsed(),
                        retry_count: attempt,
                        context,
                    };
                }
                Ok(Err(report)) => ItemError::Failed(report.to_string()),
                Err(_) => ItemError::Timeout {
                    timeout_ms: config.item_timeout_ms,
                },
            }
        };

        breaker.lock().await.record_failure();

        if attempt < config.max_retries {
            attempt += 1;
            let delay = retry_delay(&config, attempt);
            debug!(attempt, delay_ms = delay.as_millis() as u64, error = %error, "process_item: retrying after backoff");
            tokio::time::sleep(delay).await;
            continue;
        }

        warn!(retries = attempt, error = %error, "process_item: retries exhausted");
        return ExecutionResult {
            item,
            status: ExecutionStatus::Failed,
            output: None,
            error: Some(error),
            elapsed: started.elapsed(),
            retry_count: attempt,
            context,
        };
    }
}

/// Backoff delay before retry attempt `n` (1-based):
/// `base * factor^(n-1)`, plus up to 10% uniform jitter when enabled
fn retry_delay(config: &ExecutorConfig, attempt: u32) -> Duration {
    let base = config.base_retry_delay().as_millis() as f64;
    let mut delay_ms = base * config.backoff_factor.powi(attempt as i32 - 1);
    if config.jitter {
        delay_ms += rand::rng().random_range(0.0..=0.1) * delay_ms;
    }
    Duration::from_millis(delay_ms as u64)
}
