//! Crawler module for fetching and processing listing pages
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with retry, throttling and identity rotation
//! - Request pacing between pages and between requests
//! - Link and record extraction
//! - Overall crawl coordination

mod coordinator;
pub mod events;
mod fetcher;
mod governor;
pub mod pacing;
mod parser;
mod retry;

pub use coordinator::{Coordinator, CoordinatorBuilder};
pub use events::{CrawlEvent, CrawlObserver, EventLog, PartitionEnd, TracingObserver};
pub use fetcher::{build_http_client, Fetcher};
pub use governor::RateGovernor;
pub use pacing::{DelayRange, Jitter, RecordingSleeper, Sleeper, TokioSleeper};
pub use parser::{parse_selector, PageExtractor, SelectorExtractor};
pub use retry::{RetryDecision, RetryPolicy};

use crate::config::Config;
use crate::output::{BatchSink, CrawlSummary};
use crate::SweepError;
use tokio_util::sync::CancellationToken;

/// Runs a complete crawl with production collaborators
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Build the extractor, HTTP client and pacing from `config`
/// 2. Walk every partition until the cap or the last page
/// 3. Flush the residual batch and close `sink`
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `sink` - Destination for flushed batches
/// * `cancel` - Stops the crawl early; accepted records are still flushed
///
/// # Returns
///
/// * `Ok(CrawlSummary)` - Crawl finished
/// * `Err(SweepError)` - A batch could not be flushed
pub async fn crawl(
    config: Config,
    sink: Box<dyn BatchSink>,
    cancel: CancellationToken,
) -> Result<CrawlSummary, SweepError> {
    Coordinator::builder(config, sink)
        .cancellation(cancel)
        .build()?
        .run()
        .await
}
