//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the main crawl loop that coordinates all aspects of
//! the crawling process, including:
//! - Walking partitions in order and paginating each one
//! - Fetching detail pages in a bounded window
//! - Deduplicating records and rotating them into batches
//! - Enforcing the record cap
//! - Handling cancellation by draining what was already accepted

use crate::config::Config;
use crate::crawler::events::{CrawlEvent, CrawlObserver, PartitionEnd, TracingObserver};
use crate::crawler::fetcher::{build_http_client, Fetcher};
use crate::crawler::governor::RateGovernor;
use crate::crawler::pacing::{Jitter, Sleeper, TokioSleeper};
use crate::crawler::parser::{PageExtractor, SelectorExtractor};
use crate::output::{BatchSink, BatchWriter, CrawlSummary, FlushReport, StopReason};
use crate::state::{Admission, CrawlPhase, PartitionCursor, SeenSet};
use crate::storage::RunStatus;
use crate::url::ListingTemplate;
use crate::{ExtractionError, FetchError, SweepError};
use chrono::Utc;
use reqwest::Client;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

type DetailFetch = (String, JoinHandle<Result<String, FetchError>>);

/// Detail fetches in flight, in link order
///
/// Whatever is still queued when the window is dropped gets aborted, so no
/// spawned fetch outlives the page that started it.
#[derive(Default)]
struct DetailWindow {
    fetches: VecDeque<DetailFetch>,
}

impl DetailWindow {
    fn len(&self) -> usize {
        self.fetches.len()
    }

    fn push(&mut self, url: String, handle: JoinHandle<Result<String, FetchError>>) {
        self.fetches.push_back((url, handle));
    }

    fn pop_front(&mut self) -> Option<DetailFetch> {
        self.fetches.pop_front()
    }

    fn abort_all(&mut self) {
        for (_, handle) in self.fetches.drain(..) {
            handle.abort();
        }
    }
}

impl Drop for DetailWindow {
    fn drop(&mut self) {
        self.abort_all();
    }
}

/// Assembles a [`Coordinator`] from a configuration and its collaborators
///
/// Every collaborator except the sink has a production default: a
/// selector extractor built from `[extractor]`, real tokio sleeps, tracing
/// output and a fresh cancellation token.
pub struct CoordinatorBuilder {
    config: Config,
    sink: Box<dyn BatchSink>,
    extractor: Option<Arc<dyn PageExtractor>>,
    sleeper: Option<Arc<dyn Sleeper>>,
    observer: Option<Arc<dyn CrawlObserver>>,
    cancellation: Option<CancellationToken>,
    client: Option<Client>,
}

impl CoordinatorBuilder {
    pub fn extractor(mut self, extractor: Arc<dyn PageExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = Some(sleeper);
        self
    }

    pub fn observer(mut self, observer: Arc<dyn CrawlObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Uses a prebuilt HTTP client instead of one built from `[fetcher]`
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Builds the coordinator
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(SweepError)` - The template, selectors or HTTP client were invalid
    pub fn build(self) -> Result<Coordinator, SweepError> {
        let config = self.config;

        let template = ListingTemplate::parse(&config.crawler.listing_url_template)?;
        let extractor: Arc<dyn PageExtractor> = match self.extractor {
            Some(extractor) => extractor,
            None => Arc::new(SelectorExtractor::new(&config.extractor)?),
        };
        let sleeper: Arc<dyn Sleeper> = self.sleeper.unwrap_or_else(|| Arc::new(TokioSleeper));
        let observer: Arc<dyn CrawlObserver> =
            self.observer.unwrap_or_else(|| Arc::new(TracingObserver));
        let client = match self.client {
            Some(client) => client,
            None => build_http_client(&config.fetcher)?,
        };

        let jitter = Arc::new(Jitter::new(config.crawler.seed));
        let governor = Arc::new(RateGovernor::from_config(
            &config.governor,
            jitter.clone(),
            sleeper.clone(),
        ));
        let fetcher = Arc::new(Fetcher::new(
            client,
            &config.fetcher,
            governor.clone(),
            jitter,
            sleeper,
            observer.clone(),
        ));

        Ok(Coordinator {
            template,
            fetcher,
            governor,
            extractor,
            writer: BatchWriter::new(self.sink, config.crawler.batch_size),
            seen: SeenSet::new(),
            observer,
            cancel: self.cancellation.unwrap_or_else(CancellationToken::new),
            phase: CrawlPhase::PartitionIterating,
            partitions: config.crawler.partitions.iter().cloned().collect(),
            cursor: None,
            partition_pages: 0,
            pending_links: Vec::new(),
            record_cap: config.crawler.record_cap as u64,
            detail_concurrency: config.crawler.detail_concurrency.max(1),
            summary: CrawlSummary::new(),
        })
    }
}

/// Main crawler coordinator structure
///
/// Owns the crawl state machine. Admission, counting and buffering all
/// happen on the task driving [`run`](Self::run); spawned tasks only fetch.
pub struct Coordinator {
    template: ListingTemplate,
    fetcher: Arc<Fetcher>,
    governor: Arc<RateGovernor>,
    extractor: Arc<dyn PageExtractor>,
    writer: BatchWriter,
    seen: SeenSet,
    observer: Arc<dyn CrawlObserver>,
    cancel: CancellationToken,
    phase: CrawlPhase,
    partitions: VecDeque<String>,
    cursor: Option<PartitionCursor>,
    /// Listing pages fetched in the current partition
    partition_pages: u32,
    pending_links: Vec<String>,
    record_cap: u64,
    detail_concurrency: usize,
    summary: CrawlSummary,
}

impl Coordinator {
    /// Starts building a coordinator that writes batches to `sink`
    pub fn builder(config: Config, sink: Box<dyn BatchSink>) -> CoordinatorBuilder {
        CoordinatorBuilder {
            config,
            sink,
            extractor: None,
            sleeper: None,
            observer: None,
            cancellation: None,
            client: None,
        }
    }

    /// Runs the crawl until it stops
    ///
    /// Per-link and per-page failures are counted and skipped. Only a batch
    /// flush failure (or an internal state error) ends the run early; the
    /// sink is then closed as failed and the error returned.
    pub async fn run(&mut self) -> Result<CrawlSummary, SweepError> {
        self.summary.started_at = Some(Utc::now());
        tracing::info!(
            "Starting crawl of {} partitions (cap {}, concurrency {})",
            self.partitions.len(),
            self.record_cap,
            self.detail_concurrency
        );

        while !self.phase.is_terminal() {
            if let Err(e) = self.step().await {
                tracing::error!("Crawl failed in {}: {}", self.phase, e);
                self.writer.abort();
                self.phase = CrawlPhase::Stopped;
                self.summary.stop_reason = Some(StopReason::Failed);
                self.summary.finished_at = Some(Utc::now());
                self.emit(CrawlEvent::RunStopped {
                    reason: StopReason::Failed,
                    accepted: self.summary.accepted,
                });
                return Err(e);
            }
        }

        Ok(self.summary.clone())
    }

    /// Current phase
    pub fn phase(&self) -> CrawlPhase {
        self.phase
    }

    /// Counters so far
    pub fn summary(&self) -> &CrawlSummary {
        &self.summary
    }

    /// Token that cancels this crawl
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    async fn step(&mut self) -> Result<(), SweepError> {
        let next = if self.phase != CrawlPhase::Draining && self.cancel.is_cancelled() {
            self.on_cancelled()
        } else {
            match self.phase {
                CrawlPhase::PartitionIterating => self.next_partition(),
                CrawlPhase::PageFetching => self.fetch_listing().await,
                CrawlPhase::LinkProcessing => self.process_links().await?,
                CrawlPhase::Draining => self.drain()?,
                CrawlPhase::Stopped => return Ok(()),
            }
        };
        self.transition(next)
    }

    fn transition(&mut self, next: CrawlPhase) -> Result<(), SweepError> {
        if !self.phase.can_transition_to(next) {
            return Err(SweepError::InvalidTransition {
                from: self.phase,
                to: next,
            });
        }
        tracing::trace!("Phase {} -> {}", self.phase, next);
        self.phase = next;
        Ok(())
    }

    fn emit(&self, event: CrawlEvent) {
        self.observer.on_event(&event);
    }

    fn on_cancelled(&mut self) -> CrawlPhase {
        tracing::info!("Cancellation requested, draining");
        self.finish_partition(PartitionEnd::Cancelled);
        self.summary.stop_reason.get_or_insert(StopReason::Cancelled);
        CrawlPhase::Draining
    }

    fn next_partition(&mut self) -> CrawlPhase {
        match self.partitions.pop_front() {
            Some(partition) => {
                self.emit(CrawlEvent::PartitionStarted {
                    partition: partition.clone(),
                });
                self.cursor = Some(PartitionCursor::start(partition));
                self.partition_pages = 0;
                CrawlPhase::PageFetching
            }
            None => {
                self.summary
                    .stop_reason
                    .get_or_insert(StopReason::PartitionsExhausted);
                CrawlPhase::Draining
            }
        }
    }

    async fn fetch_listing(&mut self) -> CrawlPhase {
        let Some(cursor) = self.cursor.clone() else {
            return CrawlPhase::PartitionIterating;
        };

        let url = match self.template.render(&cursor.partition, cursor.page) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!("Cannot build listing URL for {}: {}", cursor.partition, e);
                self.summary.listing_failures += 1;
                self.finish_partition(PartitionEnd::ListingUnreachable);
                return CrawlPhase::PartitionIterating;
            }
        };

        tracing::info!("Fetching page {} of {}", cursor.page, cursor.partition);
        let body = match self.fetcher.fetch(url.as_str()).await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!("Listing page unavailable: {}", e);
                self.summary.listing_failures += 1;
                self.finish_partition(PartitionEnd::ListingUnreachable);
                return CrawlPhase::PartitionIterating;
            }
        };

        self.summary.pages_fetched += 1;
        self.partition_pages += 1;

        let links = self.extractor.extract_links(&body, &url);
        self.emit(CrawlEvent::PageFetched {
            partition: cursor.partition.clone(),
            page: cursor.page,
            links: links.len(),
        });

        if links.is_empty() {
            self.finish_partition(PartitionEnd::NoLinks);
            return CrawlPhase::PartitionIterating;
        }

        self.pending_links = links;
        CrawlPhase::LinkProcessing
    }

    async fn process_links(&mut self) -> Result<CrawlPhase, SweepError> {
        let mut links = std::mem::take(&mut self.pending_links).into_iter();
        let mut window = DetailWindow::default();
        self.fill_window(&mut window, &mut links);

        while let Some((url, handle)) = window.pop_front() {
            if self.cancel.is_cancelled() {
                handle.abort();
                return Ok(self.on_cancelled());
            }

            let result = match handle.await {
                Ok(result) => result,
                Err(e) => Err(FetchError::Exhausted {
                    url: url.clone(),
                    attempts: 0,
                    last: e.to_string(),
                }),
            };
            self.handle_detail(&url, result)?;

            if self.summary.accepted >= self.record_cap {
                tracing::info!("Record cap of {} reached", self.record_cap);
                window.abort_all();
                self.finish_partition(PartitionEnd::CapReached);
                self.summary.stop_reason = Some(StopReason::CapReached);
                return Ok(CrawlPhase::Draining);
            }

            if !self.cancel.is_cancelled() {
                self.fill_window(&mut window, &mut links);
            }
        }

        if let Some(delay) = self.governor.throttle(&self.cancel).await {
            self.emit(CrawlEvent::ThrottleApplied { delay });
        }
        if let Some(cursor) = self.cursor.as_mut() {
            cursor.advance();
        }
        Ok(CrawlPhase::PageFetching)
    }

    fn fill_window(
        &self,
        window: &mut DetailWindow,
        links: &mut impl Iterator<Item = String>,
    ) {
        while window.len() < self.detail_concurrency {
            let Some(url) = links.next() else {
                break;
            };
            let fetcher = self.fetcher.clone();
            let target = url.clone();
            let handle = tokio::spawn(async move { fetcher.fetch(&target).await });
            window.push(url, handle);
        }
    }

    fn handle_detail(
        &mut self,
        url: &str,
        result: Result<String, FetchError>,
    ) -> Result<(), SweepError> {
        let body = match result {
            Ok(body) => body,
            Err(e) => {
                let attempts = match &e {
                    FetchError::Exhausted { attempts, .. } => *attempts,
                    _ => 0,
                };
                self.summary.detail_failures += 1;
                self.emit(CrawlEvent::DetailSkipped {
                    url: url.to_string(),
                    attempts,
                });
                return Ok(());
            }
        };

        let candidate = match self.extractor.extract_record(&body, url) {
            Ok(candidate) => candidate,
            Err(ExtractionError::MissingField { field }) => {
                self.summary.extraction_failures += 1;
                self.emit(CrawlEvent::ExtractionSkipped {
                    url: url.to_string(),
                    field,
                });
                return Ok(());
            }
        };

        match self.seen.admit(candidate) {
            Admission::Duplicate => {
                self.summary.duplicates += 1;
                self.emit(CrawlEvent::DuplicateSkipped {
                    url: url.to_string(),
                });
            }
            Admission::Accepted(record) => {
                let record_url = record.url.clone();
                let flushed = self.writer.append(record)?;
                self.summary.accepted += 1;
                self.emit(CrawlEvent::RecordAccepted {
                    url: record_url,
                    total: self.summary.accepted,
                });
                if let Some(report) = flushed {
                    self.record_flush(report);
                }
            }
        }
        Ok(())
    }

    fn record_flush(&mut self, report: FlushReport) {
        self.summary.batches_flushed += 1;
        self.emit(CrawlEvent::BatchFlushed {
            index: report.index,
            size: report.size,
        });
    }

    fn finish_partition(&mut self, end: PartitionEnd) {
        let Some(cursor) = self.cursor.take() else {
            return;
        };

        if end == PartitionEnd::NoLinks && cursor.is_first_page() {
            tracing::warn!("Partition {} has no listings", cursor.partition);
        }
        if matches!(end, PartitionEnd::NoLinks | PartitionEnd::ListingUnreachable) {
            self.summary.partitions_completed += 1;
        }

        self.emit(CrawlEvent::PartitionFinished {
            partition: cursor.partition,
            pages: self.partition_pages,
            end,
        });
    }

    fn drain(&mut self) -> Result<CrawlPhase, SweepError> {
        let reason = self
            .summary
            .stop_reason
            .unwrap_or(StopReason::PartitionsExhausted);
        let status = match reason {
            StopReason::Cancelled => RunStatus::Interrupted,
            StopReason::Failed => RunStatus::Failed,
            StopReason::CapReached | StopReason::PartitionsExhausted => RunStatus::Completed,
        };

        if let Some(report) = self.writer.finish(status)? {
            self.record_flush(report);
        }

        self.summary.stop_reason = Some(reason);
        self.summary.finished_at = Some(Utc::now());
        self.emit(CrawlEvent::RunStopped {
            reason,
            accepted: self.summary.accepted,
        });
        Ok(CrawlPhase::Stopped)
    }
}
