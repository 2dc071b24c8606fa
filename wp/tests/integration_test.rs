//! Integration tests for workpool
//!
//! These tests verify end-to-end behavior of the three components and
//! their composition: admission gating a fan-out, and a scheduler pool
//! processing dependent, prioritized tasks.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde_json::{Value, json};

use workpool::admission::{AdmissionConfig, AdmissionController};
use workpool::domain::{Priority, Task, work_fn};
use workpool::executor::{BatchExecutor, ExecutorConfig, ItemError};
use workpool::scheduler::{Scheduler, SchedulerConfig};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

// =============================================================================
// Scheduler Tests
// =============================================================================

#[tokio::test]
async fn test_scheduler_processes_a_dependent_pipeline() {
    init_tracing();

    let scheduler = Scheduler::start(SchedulerConfig {
        worker_count: 2,
        poll_interval_ms: 10,
        ..Default::default()
    });

    // fetch -> parse -> score, submitted out of order
    let work = work_fn(|input| async move {
        let stage = input["kwargs"]["stage"].as_str().unwrap_or("").to_string();
        tokio::time::sleep(Duration::from_millis(10)).await;
        Ok(json!({ "stage": stage }))
    });

    scheduler
        .submit(
            Task::new("score", Arc::clone(&work))
                .with_id("score")
                .with_kwarg("stage", json!("score"))
                .with_deps(vec!["parse".to_string()]),
        )
        .await
        .unwrap();
    scheduler
        .submit(
            Task::new("parse", Arc::clone(&work))
                .with_id("parse")
                .with_kwarg("stage", json!("parse"))
                .with_deps(vec!["fetch".to_string()]),
        )
        .await
        .unwrap();
    scheduler
        .submit(
            Task::new("fetch", work)
                .with_id("fetch")
                .with_kwarg("stage", json!("fetch")),
        )
        .await
        .unwrap();

    let value = scheduler.result("score", Duration::from_secs(5)).await.unwrap();
    assert_eq!(value["stage"], json!("score"));

    let stats = scheduler.stats().await;
    assert_eq!(stats.completed, 3);
    assert_eq!(stats.failed, 0);
    assert_eq!(stats.success_rate, 1.0);

    scheduler.shutdown(Some(Duration::from_secs(1))).await;
}

#[tokio::test]
async fn test_scheduler_shutdown_finishes_in_flight_work() {
    init_tracing();

    let scheduler = Scheduler::start(SchedulerConfig {
        worker_count: 1,
        poll_interval_ms: 10,
        ..Default::default()
    });

    let finished = Arc::new(AtomicUsize::new(0));
    let slow = {
        let finished = Arc::clone(&finished);
        work_fn(move |_| {
            let finished = Arc::clone(&finished);
            async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                finished.fetch_add(1, Ordering::SeqCst);
                Ok(Value::Null)
            }
        })
    };

    scheduler.submit(Task::new("slow", slow)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    scheduler.shutdown(Some(Duration::from_secs(2))).await;
    assert_eq!(finished.load(Ordering::SeqCst), 1);
}

// =============================================================================
// Executor Tests
// =============================================================================

#[tokio::test]
async fn test_executor_fans_out_a_keyword_batch() {
    init_tracing();

    let executor = BatchExecutor::new(ExecutorConfig {
        max_concurrent: 4,
        max_retries: 1,
        base_retry_delay_ms: 1,
        jitter: false,
        breaker_threshold: 50,
        ..Default::default()
    });

    // Every third keyword fails on its first attempt, then succeeds on retry
    let seen = Arc::new(std::sync::Mutex::new(std::collections::HashSet::new()));
    let flaky = {
        let seen = Arc::clone(&seen);
        work_fn(move |input| {
            let seen = Arc::clone(&seen);
            async move {
                let n = input["n"].as_u64().unwrap_or(0);
                let first_attempt = seen.lock().unwrap().insert(n);
                if n % 3 == 0 && first_attempt {
                    Err(eyre::eyre!("transient enrichment error"))
                } else {
                    Ok(json!({ "keyword": input["keyword"], "score": n * 7 }))
                }
            }
        })
    };

    let items: Vec<Value> = (0..12)
        .map(|n| json!({ "n": n, "keyword": format!("kw-{}", n) }))
        .collect();
    let results = executor.process_all(items, flaky, HashMap::new()).await;

    assert_eq!(results.len(), 12);
    for (n, result) in results.iter().enumerate() {
        assert!(result.is_completed(), "item {} should complete", n);
        assert_eq!(result.item["n"], json!(n));
    }
}

#[tokio::test]
async fn test_executor_breaker_isolates_a_dying_downstream() {
    init_tracing();

    let executor = BatchExecutor::new(ExecutorConfig {
        max_concurrent: 1,
        max_retries: 0,
        breaker_threshold: 3,
        breaker_open_ms: 60_000,
        ..Default::default()
    });

    let failing = work_fn(|_| async move { Err(eyre::eyre!("downstream dead")) });
    for n in 0..3 {
        executor
            .process_all(vec![json!(n)], Arc::clone(&failing), HashMap::new())
            .await;
    }

    // Once the breaker is open, whole batches short-circuit unserved
    let items: Vec<Value> = (0..5).map(|n| json!(n)).collect();
    let results = executor.process_all(items, failing, HashMap::new()).await;
    for result in &results {
        assert_eq!(result.error, Some(ItemError::CircuitOpen));
    }
}

// =============================================================================
// Composition Tests
// =============================================================================

#[tokio::test]
async fn test_admission_gates_an_executor_fan_out() {
    init_tracing();

    let controller = Arc::new(AdmissionController::new(AdmissionConfig {
        initial_rate: 5.0,
        min_rate: 1.0,
        max_rate: 10.0,
        burst_capacity: 3.0,
        high_priority_burst: 0,
        ..Default::default()
    }));
    let executor = BatchExecutor::new(ExecutorConfig {
        max_concurrent: 2,
        max_retries: 0,
        ..Default::default()
    });

    // Only admitted keywords reach the executor
    let mut admitted = Vec::new();
    let mut rejected = 0usize;
    for n in 0..6 {
        if controller.allow(&format!("batch-{}", n), Priority::Normal, None).await {
            admitted.push(json!(n));
        } else {
            rejected += 1;
        }
    }
    assert_eq!(admitted.len(), 3);
    assert_eq!(rejected, 3);

    let work = work_fn(|input| async move { Ok(json!({ "enriched": input })) });
    let results = executor.process_all(admitted, work, HashMap::new()).await;
    assert_eq!(results.len(), 3);
    for result in &results {
        assert!(result.is_completed());
        controller.record_response_time(result.elapsed).await;
    }

    let metrics = controller.metrics().await;
    assert_eq!(metrics.allowed, 3);
    assert_eq!(metrics.blocked, 3);
}

#[tokio::test]
async fn test_scheduler_feeding_results_back_into_admission() {
    init_tracing();

    let controller = Arc::new(AdmissionController::new(AdmissionConfig {
        initial_rate: 50.0,
        max_rate: 100.0,
        burst_capacity: 10.0,
        ..Default::default()
    }));
    let scheduler = Scheduler::start(SchedulerConfig {
        worker_count: 2,
        poll_interval_ms: 10,
        ..Default::default()
    });

    let work = work_fn(|input| async move { Ok(json!({ "done": input["args"][0] })) });

    let mut ids = Vec::new();
    for n in 0..5 {
        if controller.allow("pipeline", Priority::Normal, Some(Duration::from_millis(200))).await {
            let id = scheduler
                .submit(Task::new("enrich", Arc::clone(&work)).with_args(vec![json!(n)]))
                .await
                .unwrap();
            ids.push(id);
        }
    }
    assert_eq!(ids.len(), 5);

    for id in &ids {
        let value = scheduler.result(id, Duration::from_secs(2)).await.unwrap();
        assert!(value["done"].is_number());
        controller.record_response_time(Duration::from_millis(20)).await;
    }

    // Healthy feedback: adaptation may only move the rate up, within bounds
    controller.adapt().await;
    let metrics = controller.metrics().await;
    assert!(metrics.current_rate >= 50.0);
    assert!(metrics.current_rate <= 100.0);

    scheduler.shutdown(Some(Duration::from_secs(1))).await;
}
