//! Scheduler error types

use thiserror::Error;

/// Errors surfaced by the scheduler
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("Scheduler is shutting down, submission rejected")]
    NotRunning,

    #[error("Duplicate task id: {id}")]
    DuplicateTask { id: String },

    #[error("Unknown task id: {id}")]
    UnknownTask { id: String },

    #[error("Task {id} failed: {message}")]
    Failed { id: String, message: String },

    #[error("Timed out after {waited_ms}ms waiting for task {id}")]
    ResultTimeout { id: String, waited_ms: u64 },
}
