//! Bounded rolling histories for admission statistics

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Statistics window: older samples are ignored by queries, not eagerly
/// evicted (the size cap takes care of memory)
pub(crate) const STATS_WINDOW: Duration = Duration::from_secs(300);

/// A capped ring of timestamped samples, oldest evicted first
#[derive(Debug)]
pub(crate) struct RollingWindow<T> {
    samples: VecDeque<(Instant, T)>,
    cap: usize,
}

impl<T> RollingWindow<T> {
    pub fn new(cap: usize) -> Self {
        let cap = cap.max(1);
        Self {
            samples: VecDeque::with_capacity(cap),
            cap,
        }
    }

    pub fn push(&mut self, value: T) {
        if self.samples.len() == self.cap {
            self.samples.pop_front();
        }
        self.samples.push_back((Instant::now(), value));
    }

    /// Samples no older than the stats window
    pub fn recent(&self) -> impl Iterator<Item = &T> {
        let cutoff = Instant::now().checked_sub(STATS_WINDOW);
        self.samples
            .iter()
            .filter(move |(at, _)| cutoff.is_none_or(|cutoff| *at >= cutoff))
            .map(|(_, value)| value)
    }

    pub fn recent_count(&self) -> usize {
        self.recent().count()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }
}
