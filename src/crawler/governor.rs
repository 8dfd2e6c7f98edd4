//! Request pacing
//!
//! The governor owns two waits: a minimum spacing between any two outbound
//! requests, and the randomized pause between listing pages of a partition.

use crate::config::GovernorConfig;
use crate::crawler::pacing::{DelayRange, Jitter, Sleeper};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Paces requests for the whole crawl
///
/// Shared behind an `Arc` by the fetcher and the coordinator.
pub struct RateGovernor {
    page_delay: DelayRange,
    spacing: Duration,
    /// Earliest instant the next request may start; `None` before the first
    next_slot: Mutex<Option<Instant>>,
    jitter: Arc<Jitter>,
    sleeper: Arc<dyn Sleeper>,
}

impl RateGovernor {
    pub fn new(
        page_delay: DelayRange,
        spacing: Duration,
        jitter: Arc<Jitter>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            page_delay,
            spacing,
            next_slot: Mutex::new(None),
            jitter,
            sleeper,
        }
    }

    pub fn from_config(
        config: &GovernorConfig,
        jitter: Arc<Jitter>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self::new(
            DelayRange::from_millis(config.page_delay_min_ms, config.page_delay_max_ms),
            Duration::from_millis(config.request_spacing_ms),
            jitter,
            sleeper,
        )
    }

    /// Waits until the next request slot and claims it
    ///
    /// Returns how long it waited. The slot is reserved before sleeping, so
    /// concurrent callers queue up one spacing apart.
    pub async fn acquire(&self) -> Duration {
        if self.spacing.is_zero() {
            return Duration::ZERO;
        }

        let wait = {
            let mut next = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = match *next {
                Some(slot) if slot > now => slot,
                _ => now,
            };
            *next = Some(slot + self.spacing);
            slot - now
        };

        if !wait.is_zero() {
            tracing::trace!("Waiting {:?} for request slot", wait);
            self.sleeper.sleep(wait).await;
        }
        wait
    }

    /// Sleeps a random page delay, giving up when `token` fires
    ///
    /// Returns the delay slept, or `None` if the wait was cut short (or
    /// never started) because of cancellation.
    pub async fn throttle(&self, token: &CancellationToken) -> Option<Duration> {
        if token.is_cancelled() {
            return None;
        }

        let delay = self.jitter.sample(self.page_delay);
        if delay.is_zero() {
            return Some(delay);
        }

        tokio::select! {
            biased;
            _ = token.cancelled() => None,
            _ = self.sleeper.sleep(delay) => Some(delay),
        }
    }
}
