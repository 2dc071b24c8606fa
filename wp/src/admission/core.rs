//! Admission controller implementation

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, oneshot};
use tracing::{debug, info, warn};

use crate::domain::Priority;

use super::config::AdmissionConfig;
use super::history::{RollingWindow, STATS_WINDOW};

/// Load bands reported by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for LoadLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// External probe supplying a 0.0-1.0 system load signal
///
/// When absent, load is inferred from recent request volume relative to
/// what the current rate could serve over the stats window.
pub trait LoadProbe: Send + Sync {
    fn sample(&self) -> Option<f64>;
}

/// Point-in-time admission metrics
#[derive(Debug, Clone, Serialize)]
pub struct AdmissionMetrics {
    pub current_rate: f64,
    pub tokens: f64,
    pub high_priority_burst_remaining: u32,
    pub allowed: u64,
    pub blocked: u64,
    /// Callers currently parked in the wait queues
    pub waiting: usize,
    pub current_load: f64,
    pub load_level: LoadLevel,
    pub adaptation_count: u64,
    /// Seconds since the rate was last adjusted
    pub seconds_since_adaptation: f64,
    pub avg_response_ms: f64,
    pub error_rate: f64,
    pub breaker_open: bool,
}

/// A parked caller awaiting a token
struct Waiter {
    waiter_id: u64,
    tx: oneshot::Sender<()>,
}

/// Internal state protected by mutex
struct AdmissionInner {
    current_rate: f64,
    tokens: f64,
    last_refill: Instant,

    /// Emergency allowance for high-priority requests, never refilled
    high_priority_burst: u32,

    requests: RollingWindow<bool>,
    response_times: RollingWindow<f64>,
    errors: RollingWindow<String>,

    allowed: u64,
    blocked: u64,
    adaptation_count: u64,
    last_adaptation: Instant,

    /// Per-priority FIFO wait queues
    waiters: HashMap<Priority, VecDeque<Waiter>>,
    next_waiter_id: u64,

    /// Admission breaker sub-state
    breaker_failures: u32,
    breaker_last_failure: Option<Instant>,
}

impl AdmissionInner {
    /// Accrue tokens for the time elapsed since the last refill
    fn refill(&mut self, burst_capacity: f64) {
        let elapsed = self.last_refill.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.tokens = (self.tokens + elapsed * self.current_rate).min(burst_capacity);
            self.last_refill = Instant::now();
        }
    }

    fn breaker_open(&self, threshold: u32, cooldown: Duration) -> bool {
        self.breaker_failures >= threshold
            && self.breaker_last_failure.is_some_and(|at| at.elapsed() <= cooldown)
    }

    /// Grant parked waiters while tokens remain, highest class first,
    /// FIFO within a class; grant and token consumption happen together
    /// under the state lock
    fn drain_waiters(&mut self) {
        for priority in [Priority::Critical, Priority::High, Priority::Normal, Priority::Low] {
            if self.tokens < 1.0 {
                break;
            }
            let Some(queue) = self.waiters.get_mut(&priority) else {
                continue;
            };
            while self.tokens >= 1.0 {
                let Some(waiter) = queue.pop_front() else {
                    break;
                };
                // A dropped receiver means the waiter already timed out;
                // its token is not consumed
                if waiter.tx.send(()).is_ok() {
                    self.tokens -= 1.0;
                    self.allowed += 1;
                    self.requests.push(true);
                }
            }
        }
    }

    fn waiting_count(&self) -> usize {
        self.waiters.values().map(|q| q.len()).sum()
    }

    fn avg_response_ms(&self) -> f64 {
        let times: Vec<f64> = self.response_times.recent().copied().collect();
        if times.is_empty() {
            0.0
        } else {
            times.iter().sum::<f64>() / times.len() as f64
        }
    }

    fn error_rate(&self) -> f64 {
        self.errors.recent_count() as f64 / self.requests.recent_count().max(1) as f64
    }
}

/// The AdmissionController decides, per request, whether work may proceed
/// now, after a bounded wait, or not at all
pub struct AdmissionController {
    config: AdmissionConfig,
    inner: Mutex<AdmissionInner>,
    probe: Option<Arc<dyn LoadProbe>>,
}

impl AdmissionController {
    /// Create a controller with a full token bucket
    pub fn new(config: AdmissionConfig) -> Self {
        let current_rate = config.initial_rate.clamp(config.min_rate, config.max_rate);
        debug!(current_rate, burst_capacity = config.burst_capacity, "AdmissionController::new: called");
        Self {
            inner: Mutex::new(AdmissionInner {
                current_rate,
                tokens: config.burst_capacity,
                last_refill: Instant::now(),
                high_priority_burst: config.high_priority_burst,
                requests: RollingWindow::new(config.rolling_window_size),
                response_times: RollingWindow::new(config.rolling_window_size),
                errors: RollingWindow::new(config.rolling_window_size),
                allowed: 0,
                blocked: 0,
                adaptation_count: 0,
                last_adaptation: Instant::now(),
                waiters: HashMap::new(),
                next_waiter_id: 0,
                breaker_failures: 0,
                breaker_last_failure: None,
            }),
            config,
            probe: None,
        }
    }

    /// Attach an external load probe (builder pattern)
    pub fn with_load_probe(mut self, probe: Arc<dyn LoadProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Decide whether a request may proceed
    ///
    /// Consumes one token when available. High-priority callers may spend
    /// the one-time emergency allowance when the bucket is empty. With a
    /// wait bound the caller parks in a per-priority FIFO queue and is
    /// admitted iff a token is granted before the deadline.
    pub async fn allow(&self, client_id: &str, priority: Priority, wait: Option<Duration>) -> bool {
        debug!(%client_id, %priority, "AdmissionController::allow: called");

        let (waiter_id, rx, wait) = {
            let mut inner = self.inner.lock().await;

            if inner.breaker_open(self.config.breaker_threshold, self.config.breaker_cooldown()) {
                debug!(%client_id, "AdmissionController::allow: breaker open, fail fast");
                inner.blocked += 1;
                inner.requests.push(false);
                return false;
            }

            inner.refill(self.config.burst_capacity);
            inner.drain_waiters();

            if inner.tokens >= 1.0 {
                inner.tokens -= 1.0;
                inner.allowed += 1;
                inner.requests.push(true);
                debug!(%client_id, tokens = inner.tokens, "AdmissionController::allow: token consumed");
                return true;
            }

            if priority >= Priority::High && inner.high_priority_burst > 0 {
                inner.high_priority_burst -= 1;
                inner.allowed += 1;
                inner.requests.push(true);
                warn!(%client_id, remaining = inner.high_priority_burst, "AdmissionController::allow: emergency burst consumed");
                return true;
            }

            let Some(wait) = wait.filter(|w| !w.is_zero()) else {
                inner.blocked += 1;
                inner.requests.push(false);
                debug!(%client_id, "AdmissionController::allow: no capacity, denied");
                return false;
            };

            let (tx, rx) = oneshot::channel();
            let waiter_id = inner.next_waiter_id;
            inner.next_waiter_id += 1;
            inner.waiters.entry(priority).or_default().push_back(Waiter { waiter_id, tx });
            debug!(%client_id, waiter_id, wait_ms = wait.as_millis() as u64, "AdmissionController::allow: parked");
            (waiter_id, rx, wait)
        };

        self.wait_for_grant(client_id, priority, waiter_id, rx, wait).await
    }

    /// Park until granted or the deadline passes
    async fn wait_for_grant(
        &self,
        client_id: &str,
        priority: Priority,
        waiter_id: u64,
        mut rx: oneshot::Receiver<()>,
        wait: Duration,
    ) -> bool {
        let deadline = Instant::now() + wait;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }

            // Pump the bucket ourselves so a lone waiter is not dependent
            // on other traffic for its wakeup; the tick tracks roughly one
            // token interval
            let tick = {
                let mut inner = self.inner.lock().await;
                inner.refill(self.config.burst_capacity);
                inner.drain_waiters();
                Duration::from_secs_f64((1.0 / inner.current_rate).clamp(0.005, 0.1))
            };

            tokio::select! {
                granted = &mut rx => {
                    if granted.is_ok() {
                        debug!(%client_id, waiter_id, "AdmissionController::wait_for_grant: admitted");
                        return true;
                    }
                    break;
                }
                _ = tokio::time::sleep(tick.min(remaining)) => {}
            }
        }

        // Deadline passed: leave the queue. The final receive check runs
        // under the same lock as the removal, so a grant that raced the
        // deadline still counts as admitted and no token is lost.
        let mut inner = self.inner.lock().await;
        if let Some(queue) = inner.waiters.get_mut(&priority) {
            queue.retain(|w| w.waiter_id != waiter_id);
        }
        match rx.try_recv() {
            Ok(()) => {
                debug!(%client_id, waiter_id, "AdmissionController::wait_for_grant: admitted at deadline");
                true
            }
            Err(_) => {
                inner.blocked += 1;
                inner.requests.push(false);
                debug!(%client_id, waiter_id, "AdmissionController::wait_for_grant: timed out");
                false
            }
        }
    }

    /// Record an observed downstream response time
    pub async fn record_response_time(&self, elapsed: Duration) {
        let mut inner = self.inner.lock().await;
        inner.response_times.push(elapsed.as_secs_f64() * 1_000.0);
        if inner.breaker_failures > 0 {
            debug!(failures = inner.breaker_failures, "AdmissionController::record_response_time: breaker reset");
        }
        inner.breaker_failures = 0;
        inner.breaker_last_failure = None;

        inner.refill(self.config.burst_capacity);
        inner.drain_waiters();
    }

    /// Record an observed downstream error
    pub async fn record_error(&self, error: impl Into<String>) {
        let message = error.into();
        debug!(%message, "AdmissionController::record_error: called");
        let mut inner = self.inner.lock().await;
        inner.errors.push(message);
        inner.breaker_failures += 1;
        inner.breaker_last_failure = Some(Instant::now());
        if inner.breaker_failures == self.config.breaker_threshold {
            warn!(failures = inner.breaker_failures, "AdmissionController::record_error: admission breaker opened");
        }
    }

    /// Recompute the allowed rate from load, latency, and error feedback
    ///
    /// Expected to run periodically (caller's schedule); safe to call
    /// concurrently with `allow`.
    pub async fn adapt(&self) {
        debug!("AdmissionController::adapt: called");
        let mut inner = self.inner.lock().await;
        inner.refill(self.config.burst_capacity);

        let load = self.current_load(&inner);
        let avg_response = inner.avg_response_ms();
        let error_rate = inner.error_rate();

        let load_factor = load_factor(load, &self.config.load_thresholds);
        let response_factor = response_factor(avg_response, self.config.target_response_ms);
        let error_factor = error_factor(error_rate);

        let adjustment = (load_factor + response_factor + error_factor) / 3.0;
        let new_rate = (inner.current_rate * adjustment).clamp(self.config.min_rate, self.config.max_rate);

        if (new_rate - inner.current_rate).abs() > self.config.adaptation_factor * inner.current_rate {
            info!(
                old_rate = inner.current_rate,
                new_rate,
                load,
                avg_response_ms = avg_response,
                error_rate,
                "AdmissionController::adapt: rate adjusted"
            );
            inner.current_rate = new_rate;
            inner.adaptation_count += 1;
            inner.last_adaptation = Instant::now();
        } else {
            debug!(proposed = new_rate, current = inner.current_rate, "AdmissionController::adapt: within hysteresis band");
        }

        inner.drain_waiters();
    }

    /// Map the current load fraction to a band
    pub async fn load_level(&self) -> LoadLevel {
        let inner = self.inner.lock().await;
        level_for(self.current_load(&inner), &self.config.load_thresholds)
    }

    /// Snapshot of admission metrics
    pub async fn metrics(&self) -> AdmissionMetrics {
        debug!("AdmissionController::metrics: called");
        let mut inner = self.inner.lock().await;
        inner.refill(self.config.burst_capacity);

        let current_load = self.current_load(&inner);
        AdmissionMetrics {
            current_rate: inner.current_rate,
            tokens: inner.tokens,
            high_priority_burst_remaining: inner.high_priority_burst,
            allowed: inner.allowed,
            blocked: inner.blocked,
            waiting: inner.waiting_count(),
            current_load,
            load_level: level_for(current_load, &self.config.load_thresholds),
            adaptation_count: inner.adaptation_count,
            seconds_since_adaptation: inner.last_adaptation.elapsed().as_secs_f64(),
            avg_response_ms: inner.avg_response_ms(),
            error_rate: inner.error_rate(),
            breaker_open: inner.breaker_open(self.config.breaker_threshold, self.config.breaker_cooldown()),
        }
    }

    /// Probe-supplied load, else inferred from recent request volume
    /// relative to what the current rate could serve over the window
    fn current_load(&self, inner: &AdmissionInner) -> f64 {
        if let Some(probe) = &self.probe
            && let Some(load) = probe.sample()
        {
            return load.clamp(0.0, 1.0);
        }
        let capacity = inner.current_rate * STATS_WINDOW.as_secs_f64();
        if capacity <= 0.0 {
            return 0.0;
        }
        (inner.requests.recent_count() as f64 / capacity).clamp(0.0, 1.0)
    }
}

/// Decreases as system load worsens
fn load_factor(load: f64, thresholds: &[f64; 4]) -> f64 {
    if load < thresholds[0] {
        1.15
    } else if load < thresholds[1] {
        1.0
    } else if load < thresholds[2] {
        0.85
    } else if load < thresholds[3] {
        0.7
    } else {
        0.5
    }
}

/// Decreases as responses slow relative to the target
fn response_factor(avg_response_ms: f64, target_ms: f64) -> f64 {
    if avg_response_ms <= 0.0 || target_ms <= 0.0 {
        // No signal yet
        return 1.0;
    }
    let ratio = avg_response_ms / target_ms;
    if ratio < 0.5 {
        1.15
    } else if ratio < 1.0 {
        1.0
    } else if ratio < 2.0 {
        0.8
    } else {
        0.6
    }
}

/// Decreases as the error rate climbs
fn error_factor(error_rate: f64) -> f64 {
    if error_rate < 0.01 {
        1.1
    } else if error_rate < 0.05 {
        1.0
    } else if error_rate < 0.15 {
        0.8
    } else {
        0.5
    }
}

/// Band boundaries are the medium/high/critical thresholds
fn level_for(load: f64, thresholds: &[f64; 4]) -> LoadLevel {
    if load >= thresholds[3] {
        LoadLevel::Critical
    } else if load >= thresholds[2] {
        LoadLevel::High
    } else if load >= thresholds[1] {
        LoadLevel::Medium
    } else {
        LoadLevel::Low
    }
}
