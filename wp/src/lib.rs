//! workpool - the concurrency and resilience core
//!
//! workpool lets a product safely fan large volumes of work (for example,
//! enrichment calls per keyword) out against finite local workers and
//! rate-sensitive downstream dependencies, without unbounded resource
//! growth or cascading failure.
//!
//! # Core Concepts
//!
//! - **Explicit ownership**: every component is constructed from a config
//!   and held by the caller; there is no process-wide shared pool
//! - **Failure isolation**: one task or item failing never affects its
//!   siblings' outcomes
//! - **Backpressure by design**: retried work is demoted behind fresh
//!   submissions, and admission slows or rejects work before a downstream
//!   dependency is overwhelmed
//!
//! # Modules
//!
//! - [`scheduler`] - priority task queue over a fixed worker pool, with
//!   dependency gating and bounded retry
//! - [`executor`] - bounded concurrent fan-out with backoff retry and a
//!   shared circuit breaker
//! - [`admission`] - adaptive token-bucket admission control
//! - [`domain`] - task, priority, and work-function types shared by all
//!   three

pub mod admission;
pub mod domain;
pub mod executor;
pub mod scheduler;

// Re-export commonly used types
pub use admission::{AdmissionConfig, AdmissionController, AdmissionMetrics, LoadLevel, LoadProbe};
pub use domain::{Priority, Task, TaskStatus, WorkFn, generate_task_id, now_ms, work_fn};
pub use executor::{
    BatchExecutor, CircuitBreaker, CircuitState, ExecutionResult, ExecutionStatus, ExecutorConfig, ItemError,
    ProgressFn,
};
pub use scheduler::{PendingEntry, PoolStats, Scheduler, SchedulerConfig, SchedulerError, WorkerRecord, WorkerStatus};
