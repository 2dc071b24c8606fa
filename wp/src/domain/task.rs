//! Task domain type
//!
//! A Task is the unit of schedulable work: payload, priority, dependency
//! set, and retry budget, plus the work function the pool invokes for it.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::id::generate_task_id;
use super::now_ms;
use super::work::WorkFn;

/// Task lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Queued, waiting for a worker
    #[default]
    Pending,
    /// Dispatched to a worker
    Running,
    /// Work function returned a value
    Completed,
    /// Retries exhausted or dependency failed
    Failed,
}

impl TaskStatus {
    /// Check if the task reached a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// A unit of schedulable work
#[derive(Clone)]
pub struct Task {
    /// Unique identifier (generated from category unless supplied)
    pub id: String,

    /// Free-form category label, used for advisory limits and stats breakdown
    pub category: String,

    /// Base priority, higher is served first
    ///
    /// Signed on purpose: retry demotion subtracts the retry count and is
    /// not clamped, so deeply retried work sinks below fresh submissions.
    pub priority: i64,

    /// Ordered arguments handed to the work function
    pub args: Vec<Value>,

    /// Keyed arguments handed to the work function
    pub kwargs: Map<String, Value>,

    /// Creation timestamp (Unix ms)
    pub created_at: i64,

    /// Per-execution time bound
    pub timeout: Option<Duration>,

    /// Attempts already consumed by retries
    pub retry_count: u32,

    /// Retry budget before the task is recorded as failed
    pub max_retries: u32,

    /// Task ids that must complete before this task is dispatched
    pub deps: Vec<String>,

    /// Free-form metadata, opaque to the pool
    pub metadata: HashMap<String, Value>,

    /// The work function a worker invokes for this task
    pub work: Arc<dyn WorkFn>,
}

impl Task {
    /// Create a new task with a generated ID and default budgets
    pub fn new(category: impl Into<String>, work: Arc<dyn WorkFn>) -> Self {
        let category = category.into();
        Self {
            id: generate_task_id(&category),
            category,
            priority: 5,
            args: Vec::new(),
            kwargs: Map::new(),
            created_at: now_ms(),
            timeout: None,
            retry_count: 0,
            max_retries: 3,
            deps: Vec::new(),
            metadata: HashMap::new(),
            work,
        }
    }

    /// Override the generated ID (builder pattern)
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the base priority
    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    /// Set the ordered arguments
    pub fn with_args(mut self, args: Vec<Value>) -> Self {
        self.args = args;
        self
    }

    /// Add a keyed argument
    pub fn with_kwarg(mut self, key: impl Into<String>, value: Value) -> Self {
        self.kwargs.insert(key.into(), value);
        self
    }

    /// Set the per-execution timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the retry budget
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Add a dependency task id
    pub fn with_dep(mut self, dep: impl Into<String>) -> Self {
        self.deps.push(dep.into());
        self
    }

    /// Set the full dependency list
    pub fn with_deps(mut self, deps: Vec<String>) -> Self {
        self.deps = deps;
        self
    }

    /// Add a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Effective priority after retry demotion (unclamped)
    pub fn effective_priority(&self) -> i64 {
        self.priority - self.retry_count as i64
    }

    /// JSON payload handed to the work function
    pub fn payload(&self) -> Value {
        json!({ "args": self.args, "kwargs": self.kwargs })
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("category", &self.category)
            .field("priority", &self.priority)
            .field("retry_count", &self.retry_count)
            .field("max_retries", &self.max_retries)
            .field("deps", &self.deps)
            .finish_non_exhaustive()
    }
}
