//! Queue entry, worker record, and statistics types for the scheduler

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::{Task, now_ms};

/// A pending task plus its queue ordering key
///
/// Ordering is by effective priority (descending), then submission sequence
/// (ascending), so equal-priority tasks dequeue in FIFO order.
#[derive(Debug, Clone)]
pub struct PendingEntry {
    pub task: Task,
    pub effective_priority: i64,
    pub seq: u64,
}

impl PendingEntry {
    /// Wrap a task for queue insertion at the given submission sequence
    pub fn new(task: Task, seq: u64) -> Self {
        let effective_priority = task.effective_priority();
        Self {
            task,
            effective_priority,
            seq,
        }
    }
}

impl Eq for PendingEntry {}

impl PartialEq for PendingEntry {
    fn eq(&self, other: &Self) -> bool {
        self.effective_priority == other.effective_priority && self.seq == other.seq
    }
}

impl Ord for PendingEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Higher priority first, then earlier submission
        self.effective_priority
            .cmp(&other.effective_priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for PendingEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Status of a pool worker slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WorkerStatus {
    /// Waiting for ready work
    #[default]
    Idle,
    /// Executing a task
    Busy,
    /// Last execution ended in an error
    Error,
}

impl std::fmt::Display for WorkerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Busy => write!(f, "busy"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Lifetime record for one pool worker slot
///
/// Mutated only by the owning worker loop (under the scheduler state lock);
/// stats queries receive cloned snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerRecord {
    pub worker_id: usize,
    pub status: WorkerStatus,
    pub attempted: u64,
    pub succeeded: u64,
    pub failed: u64,
    /// Cumulative time spent executing tasks (ms)
    pub busy_ms: u64,
    /// Id of the task currently executing, if any
    pub current_task: Option<String>,
    /// Last dispatch or completion (Unix ms)
    pub last_activity: i64,
}

impl WorkerRecord {
    /// Create an idle record for a pool slot
    pub fn new(worker_id: usize) -> Self {
        Self {
            worker_id,
            status: WorkerStatus::Idle,
            attempted: 0,
            succeeded: 0,
            failed: 0,
            busy_ms: 0,
            current_task: None,
            last_activity: now_ms(),
        }
    }

    /// Mark a task dispatched to this slot
    pub fn record_dispatch(&mut self, task_id: &str) {
        self.status = WorkerStatus::Busy;
        self.attempted += 1;
        self.current_task = Some(task_id.to_string());
        self.last_activity = now_ms();
    }

    /// Mark the current task finished
    pub fn record_outcome(&mut self, success: bool, elapsed: Duration) {
        if success {
            self.succeeded += 1;
            self.status = WorkerStatus::Idle;
        } else {
            self.failed += 1;
            self.status = WorkerStatus::Error;
        }
        self.busy_ms += elapsed.as_millis() as u64;
        self.current_task = None;
        self.last_activity = now_ms();
    }

    /// Average execution time across attempts (ms)
    pub fn avg_busy_ms(&self) -> f64 {
        if self.attempted == 0 {
            0.0
        } else {
            self.busy_ms as f64 / self.attempted as f64
        }
    }
}

/// Point-in-time snapshot of pool and task aggregates
#[derive(Debug, Clone, Serialize)]
pub struct PoolStats {
    pub workers: Vec<WorkerRecord>,
    pub active_workers: usize,
    pub idle_workers: usize,
    pub error_workers: usize,
    pub pending: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: u64,
    /// Pending tasks per category label
    pub pending_by_category: HashMap<String, usize>,
    /// Advisory per-category limits from the configuration
    pub category_limits: HashMap<String, usize>,
    pub success_rate: f64,
    pub avg_processing_ms: f64,
    pub uptime_ms: u64,
}
