//! Scheduler implementation

use std::collections::{BinaryHeap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::{Task, TaskStatus};

use super::config::SchedulerConfig;
use super::error::SchedulerError;
use super::queue::{PendingEntry, PoolStats, WorkerRecord, WorkerStatus};

/// Internal state protected by mutex
struct SchedulerInner {
    /// Priority queue of pending tasks
    queue: BinaryHeap<PendingEntry>,

    /// Tasks currently executing, by id
    running: HashMap<String, Task>,

    /// Results of successfully completed tasks
    completed: HashMap<String, Value>,

    /// Error text for terminally failed tasks
    failed: HashMap<String, String>,

    /// One record per pool slot
    workers: Vec<WorkerRecord>,

    /// Monotonic submission sequence, FIFO tie-break within a priority band
    seq: u64,

    /// Tasks removed from pending by cancellation
    cancelled: u64,
}

/// The Scheduler owns task lifecycle from submission to terminal state
/// across a fixed pool of workers, honoring priority order and inter-task
/// dependencies with bounded automatic retry.
pub struct Scheduler {
    config: SchedulerConfig,
    inner: Mutex<SchedulerInner>,

    /// Signals workers that pending work may be available
    queue_notify: Notify,

    /// Signals result waiters that a task reached a terminal state
    done_notify: Notify,

    /// Cleared when shutdown begins; workers observe it between iterations
    accepting: AtomicBool,

    started_at: Instant,
    handles: std::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl Scheduler {
    /// Create a scheduler and spawn its worker pool
    pub fn start(config: SchedulerConfig) -> Arc<Self> {
        let worker_count = config.worker_count.max(1);
        info!(worker_count, "Scheduler::start: spawning worker pool");

        let scheduler = Arc::new(Self {
            inner: Mutex::new(SchedulerInner {
                queue: BinaryHeap::new(),
                running: HashMap::new(),
                completed: HashMap::new(),
                failed: HashMap::new(),
                workers: (0..worker_count).map(WorkerRecord::new).collect(),
                seq: 0,
                cancelled: 0,
            }),
            config,
            queue_notify: Notify::new(),
            done_notify: Notify::new(),
            accepting: AtomicBool::new(true),
            started_at: Instant::now(),
            handles: std::sync::Mutex::new(Vec::new()),
        });

        let mut handles = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count {
            let scheduler = Arc::clone(&scheduler);
            handles.push(tokio::spawn(scheduler.worker_loop(worker_id)));
        }
        if let Ok(mut slot) = scheduler.handles.lock() {
            *slot = handles;
        }

        scheduler
    }

    /// Submit a task for asynchronous execution
    pub async fn submit(&self, task: Task) -> Result<String, SchedulerError> {
        debug!(task_id = %task.id, category = %task.category, priority = task.priority, "Scheduler::submit: called");

        if !self.accepting.load(Ordering::SeqCst) {
            debug!(task_id = %task.id, "Scheduler::submit: pool is shutting down, rejecting");
            return Err(SchedulerError::NotRunning);
        }

        let mut inner = self.inner.lock().await;

        let id = task.id.clone();
        let duplicate = inner.running.contains_key(&id)
            || inner.completed.contains_key(&id)
            || inner.failed.contains_key(&id)
            || inner.queue.iter().any(|e| e.task.id == id);
        if duplicate {
            debug!(task_id = %id, "Scheduler::submit: duplicate id, rejecting");
            return Err(SchedulerError::DuplicateTask { id });
        }

        if let Some(limit) = self.config.category_limits.get(&task.category) {
            let in_category = inner.queue.iter().filter(|e| e.task.category == task.category).count()
                + inner.running.values().filter(|t| t.category == task.category).count();
            if in_category >= *limit {
                // Advisory only: the task is admitted regardless
                warn!(task_id = %id, category = %task.category, limit, in_category, "Scheduler::submit: category over advisory limit");
            }
        }

        let seq = inner.seq;
        inner.seq += 1;
        inner.queue.push(PendingEntry::new(task, seq));
        drop(inner);

        self.queue_notify.notify_one();
        debug!(task_id = %id, seq, "Scheduler::submit: queued");
        Ok(id)
    }

    /// Cancel a pending task (no-op once running)
    pub async fn cancel(&self, id: &str) -> bool {
        debug!(task_id = %id, "Scheduler::cancel: called");
        let mut inner = self.inner.lock().await;

        if inner.running.contains_key(id) {
            debug!(task_id = %id, "Scheduler::cancel: task is running, cannot cancel");
            return false;
        }

        let before = inner.queue.len();
        let kept: Vec<PendingEntry> = inner.queue.drain().filter(|e| e.task.id != id).collect();
        inner.queue = kept.into_iter().collect();

        let removed = inner.queue.len() != before;
        if removed {
            inner.cancelled += 1;
            debug!(task_id = %id, "Scheduler::cancel: removed from pending queue");
        } else {
            debug!(task_id = %id, "Scheduler::cancel: not found in pending queue");
        }
        removed
    }

    /// Current lifecycle state of a task, if known
    pub async fn status(&self, id: &str) -> Option<TaskStatus> {
        debug!(task_id = %id, "Scheduler::status: called");
        let inner = self.inner.lock().await;

        if inner.running.contains_key(id) {
            Some(TaskStatus::Running)
        } else if inner.completed.contains_key(id) {
            Some(TaskStatus::Completed)
        } else if inner.failed.contains_key(id) {
            Some(TaskStatus::Failed)
        } else if inner.queue.iter().any(|e| e.task.id == id) {
            Some(TaskStatus::Pending)
        } else {
            None
        }
    }

    /// Wait for a task's terminal outcome
    ///
    /// Suspends on the completion signal rather than polling; returns the
    /// completed value, the stored error for a failed task, or
    /// `ResultTimeout` when `wait` elapses first.
    pub async fn result(&self, id: &str, wait: Duration) -> Result<Value, SchedulerError> {
        debug!(task_id = %id, wait_ms = wait.as_millis() as u64, "Scheduler::result: called");
        let deadline = Instant::now() + wait;

        loop {
            // Register for the terminal-transition signal before checking the
            // maps so a completion between check and park is not lost
            let notified = self.done_notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let inner = self.inner.lock().await;
                if let Some(value) = inner.completed.get(id) {
                    debug!(task_id = %id, "Scheduler::result: completed");
                    return Ok(value.clone());
                }
                if let Some(message) = inner.failed.get(id) {
                    debug!(task_id = %id, "Scheduler::result: failed");
                    return Err(SchedulerError::Failed {
                        id: id.to_string(),
                        message: message.clone(),
                    });
                }
                let known = inner.running.contains_key(id) || inner.queue.iter().any(|e| e.task.id == id);
                if !known {
                    debug!(task_id = %id, "Scheduler::result: unknown task");
                    return Err(SchedulerError::UnknownTask { id: id.to_string() });
                }
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() || tokio::time::timeout(remaining, notified).await.is_err() {
                debug!(task_id = %id, "Scheduler::result: wait timed out");
                return Err(SchedulerError::ResultTimeout {
                    id: id.to_string(),
                    waited_ms: wait.as_millis() as u64,
                });
            }
        }
    }

    /// Snapshot of pool and task aggregates
    pub async fn stats(&self) -> PoolStats {
        debug!("Scheduler::stats: called");
        let inner = self.inner.lock().await;

        let attempted: u64 = inner.workers.iter().map(|w| w.attempted).sum();
        let succeeded: u64 = inner.workers.iter().map(|w| w.succeeded).sum();
        let busy_ms: u64 = inner.workers.iter().map(|w| w.busy_ms).sum();

        let mut pending_by_category: HashMap<String, usize> = HashMap::new();
        for entry in inner.queue.iter() {
            *pending_by_category.entry(entry.task.category.clone()).or_default() += 1;
        }

        PoolStats {
            active_workers: inner.workers.iter().filter(|w| w.status == WorkerStatus::Busy).count(),
            idle_workers: inner.workers.iter().filter(|w| w.status == WorkerStatus::Idle).count(),
            error_workers: inner.workers.iter().filter(|w| w.status == WorkerStatus::Error).count(),
            workers: inner.workers.clone(),
            pending: inner.queue.len(),
            running: inner.running.len(),
            completed: inner.completed.len(),
            failed: inner.failed.len(),
            cancelled: inner.cancelled,
            pending_by_category,
            category_limits: self.config.category_limits.clone(),
            success_rate: if attempted > 0 {
                succeeded as f64 / attempted as f64
            } else {
                0.0
            },
            avg_processing_ms: if attempted > 0 {
                busy_ms as f64 / attempted as f64
            } else {
                0.0
            },
            uptime_ms: self.started_at.elapsed().as_millis() as u64,
        }
    }

    /// Stop intake immediately and wind the pool down
    ///
    /// Workers finish their in-flight task and exit; with a wait bound the
    /// call blocks up to that long before aborting stragglers, without one
    /// it aborts right away.
    pub async fn shutdown(&self, wait: Option<Duration>) {
        info!(?wait, "Scheduler::shutdown: called");
        self.accepting.store(false, Ordering::SeqCst);
        self.queue_notify.notify_waiters();

        let handles: Vec<JoinHandle<()>> = match self.handles.lock() {
            Ok(mut slot) => slot.drain(..).collect(),
            Err(_) => Vec::new(),
        };

        match wait {
            Some(wait) => {
                let deadline = tokio::time::Instant::now() + wait;
                for mut handle in handles {
                    let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
                    if tokio::time::timeout(remaining, &mut handle).await.is_err() {
                        warn!("Scheduler::shutdown: worker did not stop in time, aborting");
                        handle.abort();
                    }
                }
            }
            None => {
                for handle in handles {
                    handle.abort();
                }
            }
        }
        info!("Scheduler::shutdown: complete");
    }

    /// Whether the pool still accepts submissions
    pub fn is_running(&self) -> bool {
        self.accepting.load(Ordering::SeqCst)
    }

    /// One long-lived loop per pool slot
    async fn worker_loop(self: Arc<Self>, worker_id: usize) {
        debug!(worker_id, "Scheduler::worker_loop: started");
        loop {
            if !self.accepting.load(Ordering::SeqCst) {
                debug!(worker_id, "Scheduler::worker_loop: shutdown observed");
                break;
            }

            match self.take_ready(worker_id).await {
                Some(entry) => self.execute(worker_id, entry).await,
                None => {
                    // Nothing ready right now: park until new work arrives or
                    // the poll interval elapses (a dependency may complete
                    // meanwhile)
                    let _ = tokio::time::timeout(self.config.poll_interval(), self.queue_notify.notified()).await;
                }
            }
        }
        debug!(worker_id, "Scheduler::worker_loop: stopped");
    }

    /// Pop the highest-priority task whose dependencies are all completed
    ///
    /// Entries whose dependencies are merely unfinished go back into the
    /// queue untouched; a task with a terminally failed dependency can never
    /// become ready and is routed to the failed map instead.
    async fn take_ready(&self, worker_id: usize) -> Option<PendingEntry> {
        let mut inner = self.inner.lock().await;

        let mut deferred = Vec::new();
        let mut dep_failed: Vec<(String, String)> = Vec::new();
        let mut ready = None;

        while let Some(entry) = inner.queue.pop() {
            if let Some(dep) = entry.task.deps.iter().find(|d| inner.failed.contains_key(d.as_str())) {
                dep_failed.push((entry.task.id.clone(), dep.clone()));
                continue;
            }
            if entry.task.deps.iter().all(|d| inner.completed.contains_key(d.as_str())) {
                ready = Some(entry);
                break;
            }
            deferred.push(entry);
        }

        for entry in deferred {
            inner.queue.push(entry);
        }
        for (id, dep) in &dep_failed {
            warn!(task_id = %id, dep = %dep, "Scheduler::take_ready: dependency failed, failing task");
            inner.failed.insert(id.clone(), format!("Dependency {} failed", dep));
        }

        if let Some(entry) = &ready {
            inner.workers[worker_id].record_dispatch(&entry.task.id);
            inner.running.insert(entry.task.id.clone(), entry.task.clone());
        }
        drop(inner);

        if !dep_failed.is_empty() {
            self.done_notify.notify_waiters();
        }
        ready
    }

    /// Execute one dequeued task and route its outcome
    async fn execute(&self, worker_id: usize, entry: PendingEntry) {
        let task = entry.task;
        let task_id = task.id.clone();
        debug!(worker_id, task_id = %task_id, effective_priority = entry.effective_priority, "Scheduler::execute: dispatching");

        let started = Instant::now();
        let payload = task.payload();
        let outcome = match task.timeout {
            Some(limit) => match tokio::time::timeout(limit, task.work.call(payload)).await {
                Ok(result) => result,
                Err(_) => Err(eyre::eyre!("Task timed out after {}ms", limit.as_millis())),
            },
            None => task.work.call(payload).await,
        };
        let elapsed = started.elapsed();

        let mut inner = self.inner.lock().await;
        inner.running.remove(&task_id);

        match outcome {
            Ok(value) => {
                inner.workers[worker_id].record_outcome(true, elapsed);
                inner.completed.insert(task_id.clone(), value);
                drop(inner);

                debug!(worker_id, task_id = %task_id, elapsed_ms = elapsed.as_millis() as u64, "Scheduler::execute: completed");
                self.done_notify.notify_waiters();
                // Completion may unblock dependents waiting in the queue
                self.queue_notify.notify_waiters();
            }
            Err(report) if task.retry_count < task.max_retries => {
                let mut retry = task;
                retry.retry_count += 1;
                let demoted = retry.effective_priority();

                inner.workers[worker_id].record_outcome(false, elapsed);
                let seq = inner.seq;
                inner.seq += 1;
                inner.queue.push(PendingEntry::new(retry, seq));
                drop(inner);

                warn!(worker_id, task_id = %task_id, demoted_priority = demoted, error = %report, "Scheduler::execute: attempt failed, requeued");
                self.queue_notify.notify_one();
            }
            Err(report) => {
                inner.workers[worker_id].record_outcome(false, elapsed);
                inner.failed.insert(task_id.clone(), report.to_string());
                drop(inner);

                warn!(worker_id, task_id = %task_id, error = %report, "Scheduler::execute: retries exhausted, failed");
                self.done_notify.notify_waiters();
                // Dependents of a failed task resolve on their next pass
                self.queue_notify.notify_waiters();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::work_fn;
    use serde_json::json;
    use std::sync::atomic::AtomicU32;

    fn ok_work() -> Arc<dyn crate::domain::WorkFn> {
        work_fn(|_| async move { Ok(Value::Null) })
    }

    fn one_worker() -> SchedulerConfig {
        SchedulerConfig {
            worker_count: 1,
            poll_interval_ms: 10,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_submit_and_result() {
        let scheduler = Scheduler::start(one_worker());

        let work = work_fn(|input| async move { Ok(json!({ "got": input["args"][0] })) });
        let id = scheduler
            .submit(Task::new("enrich", work).with_args(vec![json!("kw")]))
            .await
            .unwrap();

        let value = scheduler.result(&id, Duration::from_secs(2)).await.unwrap();
        assert_eq!(value["got"], json!("kw"));
        assert_eq!(scheduler.status(&id).await, Some(TaskStatus::Completed));

        scheduler.shutdown(Some(Duration::from_secs(1))).await;
    }

    #[tokio::test]
    async fn test_priority_dispatch_order() {
        let scheduler = Scheduler::start(one_worker());

        // Hold the single worker so the queue builds up behind it
        let gate = Arc::new(Notify::new());
        let blocker = {
            let gate = Arc::clone(&gate);
            work_fn(move |_| {
                let gate = Arc::clone(&gate);
                async move {
                    gate.notified().await;
                    Ok(Value::Null)
                }
            })
        };
        scheduler
            .submit(Task::new("blocker", blocker).with_id("blocker"))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let recorder = {
            let order = Arc::clone(&order);
            work_fn(move |input| {
                let order = Arc::clone(&order);
                async move {
                    if let Ok(mut order) = order.lock() {
                        order.push(input["args"][0].as_i64().unwrap_or(0));
                    }
                    Ok(Value::Null)
                }
            })
        };

        let mut ids = Vec::new();
        for priority in [1, 9, 5] {
            let id = scheduler
                .submit(
                    Task::new("ranked", Arc::clone(&recorder))
                        .with_priority(priority)
                        .with_args(vec![json!(priority)]),
                )
                .await
                .unwrap();
            ids.push(id);
        }

        gate.notify_one();
        for id in &ids {
            scheduler.result(id, Duration::from_secs(2)).await.unwrap();
        }

        assert_eq!(*order.lock().unwrap(), vec![9, 5, 1]);
        scheduler.shutdown(Some(Duration::from_secs(1))).await;
    }

    #[tokio::test]
    async fn test_retry_bound_and_demotion() {
        let scheduler = Scheduler::start(one_worker());

        let attempts = Arc::new(AtomicU32::new(0));
        let failing = {
            let attempts = Arc::clone(&attempts);
            work_fn(move |_| {
                let attempts = Arc::clone(&attempts);
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err(eyre::eyre!("enrichment backend down"))
                }
            })
        };

        let id = scheduler
            .submit(Task::new("enrich", failing).with_max_retries(2))
            .await
            .unwrap();

        let err = scheduler.result(&id, Duration::from_secs(2)).await.unwrap_err();
        assert!(matches!(err, SchedulerError::Failed { .. }));
        assert!(err.to_string().contains("enrichment backend down"));

        // max_retries = 2 means exactly 3 attempts
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert_eq!(scheduler.status(&id).await, Some(TaskStatus::Failed));

        scheduler.shutdown(Some(Duration::from_secs(1))).await;
    }

    #[tokio::test]
    async fn test_task_timeout_is_an_error() {
        let scheduler = Scheduler::start(one_worker());

        let slow = work_fn(|_| async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Value::Null)
        });
        let id = scheduler
            .submit(
                Task::new("slow", slow)
                    .with_timeout(Duration::from_millis(20))
                    .with_max_retries(0),
            )
            .await
            .unwrap();

        let err = scheduler.result(&id, Duration::from_secs(2)).await.unwrap_err();
        assert!(err.to_string().contains("timed out"));

        scheduler.shutdown(Some(Duration::from_secs(1))).await;
    }

    #[tokio::test]
    async fn test_dependency_gating() {
        let scheduler = Scheduler::start(one_worker());

        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let recorder = {
            let order = Arc::clone(&order);
            work_fn(move |input| {
                let order = Arc::clone(&order);
                async move {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    if let Ok(mut order) = order.lock() {
                        order.push(input["args"][0].as_str().unwrap_or("").to_string());
                    }
                    Ok(Value::Null)
                }
            })
        };

        // The dependent is submitted first with the higher priority; the
        // dependency gate must still hold it back
        let child_id = scheduler
            .submit(
                Task::new("child", Arc::clone(&recorder))
                    .with_id("child")
                    .with_priority(9)
                    .with_args(vec![json!("child")])
                    .with_dep("parent"),
            )
            .await
            .unwrap();
        let parent_id = scheduler
            .submit(
                Task::new("parent", recorder)
                    .with_id("parent")
                    .with_priority(1)
                    .with_args(vec![json!("parent")]),
            )
            .await
            .unwrap();

        scheduler.result(&child_id, Duration::from_secs(2)).await.unwrap();
        scheduler.result(&parent_id, Duration::from_secs(2)).await.unwrap();

        assert_eq!(*order.lock().unwrap(), vec!["parent", "child"]);
        scheduler.shutdown(Some(Duration::from_secs(1))).await;
    }

    #[tokio::test]
    async fn test_failed_dependency_fails_dependent() {
        let scheduler = Scheduler::start(one_worker());

        let failing = work_fn(|_| async move { Err(eyre::eyre!("no data")) });
        scheduler
            .submit(Task::new("parent", failing).with_id("parent").with_max_retries(0))
            .await
            .unwrap();

        let child_id = scheduler
            .submit(Task::new("child", ok_work()).with_id("child").with_dep("parent"))
            .await
            .unwrap();

        let err = scheduler.result(&child_id, Duration::from_secs(2)).await.unwrap_err();
        assert!(err.to_string().contains("Dependency parent failed"));

        scheduler.shutdown(Some(Duration::from_secs(1))).await;
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let scheduler = Scheduler::start(one_worker());

        let gate = Arc::new(Notify::new());
        let blocker = {
            let gate = Arc::clone(&gate);
            work_fn(move |_| {
                let gate = Arc::clone(&gate);
                async move {
                    gate.notified().await;
                    Ok(Value::Null)
                }
            })
        };
        scheduler
            .submit(Task::new("a", blocker).with_id("dup"))
            .await
            .unwrap();

        let err = scheduler.submit(Task::new("b", ok_work()).with_id("dup")).await.unwrap_err();
        assert_eq!(
            err,
            SchedulerError::DuplicateTask {
                id: "dup".to_string()
            }
        );

        gate.notify_one();
        scheduler.shutdown(Some(Duration::from_secs(1))).await;
    }

    #[tokio::test]
    async fn test_cancel_pending_only() {
        let scheduler = Scheduler::start(one_worker());

        let gate = Arc::new(Notify::new());
        let blocker = {
            let gate = Arc::clone(&gate);
            work_fn(move |_| {
                let gate = Arc::clone(&gate);
                async move {
                    gate.notified().await;
                    Ok(Value::Null)
                }
            })
        };
        scheduler
            .submit(Task::new("blocker", blocker).with_id("running"))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        scheduler
            .submit(Task::new("queued", ok_work()).with_id("queued"))
            .await
            .unwrap();

        assert!(scheduler.cancel("queued").await);
        assert_eq!(scheduler.status("queued").await, None);

        // Running tasks cannot be cancelled, unknown ids report false
        assert!(!scheduler.cancel("running").await);
        assert!(!scheduler.cancel("never-submitted").await);

        gate.notify_one();
        scheduler.shutdown(Some(Duration::from_secs(1))).await;
    }

    #[tokio::test]
    async fn test_submit_after_shutdown_rejected() {
        let scheduler = Scheduler::start(one_worker());
        scheduler.shutdown(Some(Duration::from_secs(1))).await;

        let err = scheduler.submit(Task::new("late", ok_work())).await.unwrap_err();
        assert_eq!(err, SchedulerError::NotRunning);
        assert!(!scheduler.is_running());
    }

    #[tokio::test]
    async fn test_result_timeout() {
        let scheduler = Scheduler::start(one_worker());

        let gate = Arc::new(Notify::new());
        let blocker = {
            let gate = Arc::clone(&gate);
            work_fn(move |_| {
                let gate = Arc::clone(&gate);
                async move {
                    gate.notified().await;
                    Ok(Value::Null)
                }
            })
        };
        let id = scheduler.submit(Task::new("stuck", blocker)).await.unwrap();

        let err = scheduler.result(&id, Duration::from_millis(50)).await.unwrap_err();
        assert!(matches!(err, SchedulerError::ResultTimeout { .. }));

        gate.notify_one();
        scheduler.shutdown(Some(Duration::from_secs(1))).await;
    }

    #[tokio::test]
    async fn test_result_unknown_task() {
        let scheduler = Scheduler::start(one_worker());

        let err = scheduler.result("ghost", Duration::from_millis(50)).await.unwrap_err();
        assert_eq!(
            err,
            SchedulerError::UnknownTask {
                id: "ghost".to_string()
            }
        );

        scheduler.shutdown(Some(Duration::from_secs(1))).await;
    }

    #[tokio::test]
    async fn test_stats_tracking() {
        let scheduler = Scheduler::start(SchedulerConfig {
            worker_count: 2,
            poll_interval_ms: 10,
            ..Default::default()
        });

        let failing = work_fn(|_| async move { Err(eyre::eyre!("nope")) });
        let ok_id = scheduler.submit(Task::new("ok", ok_work())).await.unwrap();
        let bad_id = scheduler
            .submit(Task::new("bad", failing).with_max_retries(0))
            .await
            .unwrap();

        scheduler.result(&ok_id, Duration::from_secs(2)).await.unwrap();
        let _ = scheduler.result(&bad_id, Duration::from_secs(2)).await;

        let stats = scheduler.stats().await;
        assert_eq!(stats.workers.len(), 2);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.pending, 0);
        assert_eq!(stats.running, 0);
        assert!(stats.success_rate > 0.0 && stats.success_rate < 1.0);

        scheduler.shutdown(Some(Duration::from_secs(1))).await;
    }
}
