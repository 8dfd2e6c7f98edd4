//! Retry decisions for a single fetch
//!
//! The policy is pure: given the failed attempt it says whether to try
//! again and how long to wait first. The fetcher does the waiting.

use crate::config::FetcherConfig;
use crate::crawler::pacing::{DelayRange, Jitter};
use crate::FetchError;
use std::time::Duration;

/// Default attempts per URL, including the first
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default wait after an HTTP 429
pub const DEFAULT_THROTTLE_COOLDOWN: Duration = Duration::from_secs(30);

/// What to do after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait `delay`, then make attempt number `attempt`
    Retry { delay: Duration, attempt: u32 },

    /// The attempt budget is spent
    GiveUp,
}

/// Attempt budget and waits between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub throttle_cooldown: Duration,
    pub backoff: DelayRange,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            throttle_cooldown: DEFAULT_THROTTLE_COOLDOWN,
            backoff: DelayRange::from_millis(10_000, 20_000),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &FetcherConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            throttle_cooldown: config.throttle_cooldown(),
            backoff: DelayRange::from_millis(config.backoff_min_ms, config.backoff_max_ms),
        }
    }

    /// Decides what follows failed attempt number `attempt` (1-based)
    ///
    /// A throttled attempt waits the fixed cooldown. Any other failure waits
    /// a random backoff. Nothing is waited after the final attempt.
    pub fn decide(&self, error: &FetchError, attempt: u32, jitter: &Jitter) -> RetryDecision {
        if attempt >= self.max_attempts {
            return RetryDecision::GiveUp;
        }

        let delay = match error {
            FetchError::Throttled { .. } => self.throttle_cooldown,
            FetchError::Transient { .. } => jitter.sample(self.backoff),
            FetchError::Exhausted { .. } => return RetryDecision::GiveUp,
        };

        RetryDecision::Retry {
            delay,
            attempt: attempt + 1,
        }
    }
}
