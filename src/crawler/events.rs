//! Crawl events and observers
//!
//! The coordinator and fetcher report progress as [`CrawlEvent`]s. Observers
//! only watch; nothing they do feeds back into the crawl.

use crate::output::StopReason;
use std::sync::Mutex;
use std::time::Duration;

/// Why a partition stopped paginating
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionEnd {
    /// The listing page could not be fetched
    ListingUnreachable,

    /// The listing page had no detail links
    NoLinks,

    /// The record cap was reached inside this partition
    CapReached,

    /// The crawl was cancelled inside this partition
    Cancelled,
}

/// Something that happened during a crawl
#[derive(Debug, Clone, PartialEq)]
pub enum CrawlEvent {
    PartitionStarted {
        partition: String,
    },
    PartitionFinished {
        partition: String,
        pages: u32,
        end: PartitionEnd,
    },
    PageFetched {
        partition: String,
        page: u32,
        links: usize,
    },
    AttemptSucceeded {
        url: String,
        attempt: u32,
    },
    AttemptThrottled {
        url: String,
        attempt: u32,
    },
    AttemptFailed {
        url: String,
        attempt: u32,
        reason: String,
    },
    ThrottleApplied {
        delay: Duration,
    },
    RecordAccepted {
        url: String,
        total: u64,
    },
    DuplicateSkipped {
        url: String,
    },
    ExtractionSkipped {
        url: String,
        field: &'static str,
    },
    DetailSkipped {
        url: String,
        attempts: u32,
    },
    BatchFlushed {
        index: u32,
        size: usize,
    },
    RunStopped {
        reason: StopReason,
        accepted: u64,
    },
}

/// Receives crawl events
pub trait CrawlObserver: Send + Sync {
    fn on_event(&self, event: &CrawlEvent);
}

/// Logs every event through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl CrawlObserver for TracingObserver {
    fn on_event(&self, event: &CrawlEvent) {
        match event {
            CrawlEvent::PartitionStarted { partition } => {
                tracing::info!("Starting partition {}", partition);
            }
            CrawlEvent::PartitionFinished {
                partition,
                pages,
                end,
            } => {
                tracing::info!(
                    "Finished partition {} after {} pages ({:?})",
                    partition,
                    pages,
                    end
                );
            }
            CrawlEvent::PageFetched {
                partition,
                page,
                links,
            } => {
                tracing::info!("Page {} of {}: {} links", page, partition, links);
            }
            CrawlEvent::AttemptSucceeded { url, attempt } => {
                tracing::debug!("Fetched {} (attempt {})", url, attempt);
            }
            CrawlEvent::AttemptThrottled { url, attempt } => {
                tracing::warn!("Throttled (429) on {} (attempt {})", url, attempt);
            }
            CrawlEvent::AttemptFailed {
                url,
                attempt,
                reason,
            } => {
                tracing::warn!("Attempt {} for {} failed: {}", attempt, url, reason);
            }
            CrawlEvent::ThrottleApplied { delay } => {
                tracing::debug!("Waiting {:?} before the next listing page", delay);
            }
            CrawlEvent::RecordAccepted { url, total } => {
                tracing::debug!("Accepted #{}: {}", total, url);
            }
            CrawlEvent::DuplicateSkipped { url } => {
                tracing::debug!("Duplicate skipped: {}", url);
            }
            CrawlEvent::ExtractionSkipped { url, field } => {
                tracing::warn!("Skipping {}: missing {}", url, field);
            }
            CrawlEvent::DetailSkipped { url, attempts } => {
                tracing::warn!("Skipping {} after {} attempts", url, attempts);
            }
            CrawlEvent::BatchFlushed { index, size } => {
                tracing::info!("Flushed batch {} ({} records)", index, size);
            }
            CrawlEvent::RunStopped { reason, accepted } => {
                tracing::info!("Crawl stopped ({}) with {} records", reason, accepted);
            }
        }
    }
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<CrawlEvent>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events received so far
    pub fn events(&self) -> Vec<CrawlEvent> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of received events matching `predicate`
    pub fn count(&self, predicate: impl Fn(&CrawlEvent) -> bool) -> usize {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|e| predicate(e))
            .count()
    }
}

impl CrawlObserver for EventLog {
    fn on_event(&self, event: &CrawlEvent) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event.clone());
    }
}
