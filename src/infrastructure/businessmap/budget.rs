//! Per-instance request budget.
//!
//! Businessmap meters each API key over a rolling minute. The budget keeps
//! the send times of the most recent requests; a request that would exceed
//! the limit waits until the oldest one leaves the window. Uses the tokio
//! clock so paused-time tests can drive it.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;

/// Sliding-window request budget for one instance.
#[derive(Debug)]
pub struct RequestBudget {
    instance: String,
    limit: usize,
    window: Duration,
    sent: VecDeque<Instant>,
}

impl RequestBudget {
    /// Budget of `limit` requests per rolling minute.
    pub fn per_minute(instance: impl Into<String>, limit: u32) -> Self {
        Self::new(instance, limit, Duration::from_secs(60))
    }

    /// Budget of `limit` requests per rolling `window`. A zero limit is
    /// raised to one.
    pub fn new(instance: impl Into<String>, limit: u32, window: Duration) -> Self {
        let limit = usize::try_from(limit.max(1)).unwrap_or(usize::MAX);
        Self {
            instance: instance.into(),
            limit,
            window,
            sent: VecDeque::with_capacity(limit.min(1024)),
        }
    }

    fn prune(&mut self, now: Instant) {
        while let Some(&oldest) = self.sent.front() {
            if now.saturating_duration_since(oldest) < self.window {
                break;
            }
            self.sent.pop_front();
        }
    }

    /// How long a request issued at `now` would have to wait.
    pub fn wait_time(&mut self, now: Instant) -> Duration {
        self.prune(now);
        if self.sent.len() < self.limit {
            return Duration::ZERO;
        }
        self.sent
            .front()
            .map_or(Duration::ZERO, |&oldest| {
                (oldest + self.window).saturating_duration_since(now)
            })
    }

    /// Requests that could be sent right now without waiting.
    pub fn remaining(&mut self) -> usize {
        self.prune(Instant::now());
        self.limit.saturating_sub(self.sent.len())
    }

    /// Wait for room in the budget, then record a request.
    pub async fn acquire(&mut self) {
        let wait = self.wait_time(Instant::now());
        if !wait.is_zero() {
            tracing::warn!(
                instance = %self.instance,
                limit = self.limit,
                wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                "Businessmap request budget exhausted, waiting"
            );
            tokio::time::sleep(wait).await;
            self.prune(Instant::now());
        }
        self.sent.push_back(Instant::now());
    }
}
