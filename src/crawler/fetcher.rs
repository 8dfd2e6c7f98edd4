//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the HTTP client with timeout and compression
//! - Rotating the User-Agent header per attempt
//! - Retrying throttled and failed attempts per the [`RetryPolicy`]
//! - Error classification

use crate::config::FetcherConfig;
use crate::crawler::events::{CrawlEvent, CrawlObserver};
use crate::crawler::governor::RateGovernor;
use crate::crawler::pacing::{Jitter, Sleeper};
use crate::crawler::retry::{RetryDecision, RetryPolicy};
use crate::FetchError;
use reqwest::header::USER_AGENT;
use reqwest::{Client, StatusCode};
use std::sync::Arc;

/// Builds an HTTP client with proper configuration
///
/// The User-Agent is not set here; the fetcher picks one per attempt.
///
/// # Arguments
///
/// * `config` - The fetcher configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &FetcherConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(config.request_timeout())
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches pages with retry, throttling and identity rotation
pub struct Fetcher {
    client: Client,
    user_agents: Vec<String>,
    policy: RetryPolicy,
    governor: Arc<RateGovernor>,
    jitter: Arc<Jitter>,
    sleeper: Arc<dyn Sleeper>,
    observer: Arc<dyn CrawlObserver>,
}

impl Fetcher {
    pub fn new(
        client: Client,
        config: &FetcherConfig,
        governor: Arc<RateGovernor>,
        jitter: Arc<Jitter>,
        sleeper: Arc<dyn Sleeper>,
        observer: Arc<dyn CrawlObserver>,
    ) -> Self {
        Self {
            client,
            user_agents: config.user_agents.clone(),
            policy: RetryPolicy::from_config(config),
            governor,
            jitter,
            sleeper,
            observer,
        }
    }

    /// Fetches `url` and returns the body of a 200 response
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | HTTP 200 | Return body |
    /// | HTTP 429 | Wait the throttle cooldown, retry |
    /// | Other status | Wait a random backoff, retry |
    /// | Network error / unreadable body | Wait a random backoff, retry |
    /// | Attempts spent | `FetchError::Exhausted`, no final wait |
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let mut attempt = 1;

        loop {
            self.governor.acquire().await;

            let error = match self.attempt(url).await {
                Ok(body) => {
                    self.observer.on_event(&CrawlEvent::AttemptSucceeded {
                        url: url.to_string(),
                        attempt,
                    });
                    return Ok(body);
                }
                Err(e) => e,
            };

            self.observer.on_event(&attempt_event(url, attempt, &error));

            match self.policy.decide(&error, attempt, &self.jitter) {
                RetryDecision::Retry { delay, attempt: next } => {
                    tracing::debug!("Retrying {} in {:?} (attempt {})", url, delay, next);
                    self.sleeper.sleep(delay).await;
                    attempt = next;
                }
                RetryDecision::GiveUp => {
                    return Err(FetchError::Exhausted {
                        url: url.to_string(),
                        attempts: attempt,
                        last: failure_reason(&error),
                    });
                }
            }
        }
    }

    /// One GET with a freshly picked identity
    async fn attempt(&self, url: &str) -> Result<String, FetchError> {
        let mut request = self.client.get(url);
        if let Some(agent) = self.jitter.pick(&self.user_agents) {
            request = request.header(USER_AGENT, agent.as_str());
        }

        let response = request.send().await.map_err(|e| FetchError::Transient {
            url: url.to_string(),
            reason: classify_network_error(&e),
        })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::Throttled {
                url: url.to_string(),
            });
        }
        if status != StatusCode::OK {
            return Err(FetchError::Transient {
                url: url.to_string(),
                reason: format!("HTTP {}", status.as_u16()),
            });
        }

        response.text().await.map_err(|e| FetchError::Transient {
            url: url.to_string(),
            reason: format!("Failed to read body: {}", e),
        })
    }
}

fn attempt_event(url: &str, attempt: u32, error: &FetchError) -> CrawlEvent {
    match error {
        FetchError::Throttled { .. } => CrawlEvent::AttemptThrottled {
            url: url.to_string(),
            attempt,
        },
        _ => CrawlEvent::AttemptFailed {
            url: url.to_string(),
            attempt,
            reason: failure_reason(error),
        },
    }
}

fn failure_reason(error: &FetchError) -> String {
    match error {
        FetchError::Transient { reason, .. } => reason.clone(),
        FetchError::Throttled { .. } => "HTTP 429".to_string(),
        FetchError::Exhausted { last, .. } => last.clone(),
    }
}

fn classify_network_error(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        "Request timeout".to_string()
    } else if error.is_connect() {
        "Connection refused".to_string()
    } else {
        error.to_string()
    }
}
