//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock listing sites and run the full
//! crawl cycle end-to-end. Sleeps are recorded instead of waited.

use listing_sweep::config::{
    Config, CrawlerConfig, ExtractorConfig, FetcherConfig, GovernorConfig, OutputConfig,
};
use listing_sweep::crawler::{
    Coordinator, CrawlEvent, CrawlObserver, EventLog, PartitionEnd, RecordingSleeper,
};
use listing_sweep::output::{MemorySink, SqliteBatchSink, StopReason, XmlBatchSink};
use listing_sweep::storage::{RunStatus, SqliteStorage, Storage};
use listing_sweep::{CrawlPhase, Record, SweepError};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration crawling `partitions` on the mock server
fn create_test_config(server: &MockServer, partitions: &[&str]) -> Config {
    Config {
        crawler: CrawlerConfig {
            partitions: partitions.iter().map(|p| p.to_string()).collect(),
            listing_url_template: format!("{}/{{partition}}/list?p={{page}}", server.uri()),
            batch_size: 2000,
            record_cap: 6000,
            detail_concurrency: 1,
            seed: Some(7),
        },
        fetcher: FetcherConfig::default(),
        governor: GovernorConfig::default(),
        extractor: ExtractorConfig::default(),
        output: OutputConfig::default(),
    }
}

fn listing_html(server: &MockServer, ids: &[u32]) -> String {
    let mut html = String::from("<html><body>");
    for id in ids {
        html.push_str(&format!(
            r#"<div class="iva-item-root-_lk9K"><a href="{}/item/{}">Flat {}</a></div>"#,
            server.uri(),
            id,
            id
        ));
    }
    html.push_str("</body></html>");
    html
}

fn detail_html(title: &str, address: &str) -> String {
    format!(
        r#"<html><body>
        <h1 class="title-info-title-text">{}</h1>
        <span class="js-item-price">1 000 000</span>
        <span class="item-address__string">{}</span>
        <div class="title-info-metadata-item-redesign">today</div>
        </body></html>"#,
        title, address
    )
}

async fn mount_listing(server: &MockServer, partition: &str, page: u32, ids: &[u32]) {
    Mock::given(method("GET"))
        .and(path(format!("/{}/list", partition)))
        .and(query_param("p", page.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_html(server, ids)))
        .mount(server)
        .await;
}

/// Every page of `partition` not mounted before this call has no listings
async fn mount_end_of_listing(server: &MockServer, partition: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/{}/list", partition)))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body></body></html>"))
        .mount(server)
        .await;
}

async fn mount_detail(server: &MockServer, id: u32, title: &str, address: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/item/{}", id)))
        .respond_with(ResponseTemplate::new(200).set_body_string(detail_html(title, address)))
        .mount(server)
        .await;
}

/// Mounts details whose title and address are unique per id
async fn mount_details(server: &MockServer, ids: impl IntoIterator<Item = u32>) {
    for id in ids {
        mount_detail(server, id, &format!("Flat {}", id), &format!("Street {}", id)).await;
    }
}

fn urls(server: &MockServer, records: &[Record]) -> Vec<String> {
    let prefix = format!("{}/item/", server.uri());
    records
        .iter()
        .map(|r| r.url.trim_start_matches(&prefix).to_string())
        .collect()
}

/// Cancels the crawl once `after` records have been accepted
struct CancelAfter {
    token: CancellationToken,
    after: u64,
}

impl CrawlObserver for CancelAfter {
    fn on_event(&self, event: &CrawlEvent) {
        if let CrawlEvent::RecordAccepted { total, .. } = event {
            if *total >= self.after {
                self.token.cancel();
            }
        }
    }
}

#[tokio::test]
async fn test_cap_reached_with_partial_last_batch() {
    let server = MockServer::start().await;
    mount_listing(&server, "a", 1, &[1, 2, 3, 4]).await;
    mount_listing(&server, "a", 2, &[5, 6, 7, 8]).await;
    mount_details(&server, 1..=5).await;
    for id in 6..=8 {
        Mock::given(method("GET"))
            .and(path(format!("/item/{}", id)))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
    }

    let mut config = create_test_config(&server, &["a", "b"]);
    config.crawler.batch_size = 2;
    config.crawler.record_cap = 5;

    let sink = MemorySink::new();
    let sleeper = Arc::new(RecordingSleeper::new());
    let events = Arc::new(EventLog::new());
    let mut coordinator = Coordinator::builder(config, Box::new(sink.clone()))
        .sleeper(sleeper.clone())
        .observer(events.clone())
        .build()
        .unwrap();

    let summary = coordinator.run().await.unwrap();

    assert_eq!(summary.accepted, 5);
    assert_eq!(summary.stop_reason, Some(StopReason::CapReached));
    assert_eq!(summary.batches_flushed, 3);

    let sizes: Vec<usize> = sink.batches().iter().map(|b| b.records.len()).collect();
    assert_eq!(sizes, vec![2, 2, 1]);
    assert_eq!(urls(&server, &sink.records()), vec!["1", "2", "3", "4", "5"]);
    assert_eq!(sink.closed_with(), Some(RunStatus::Completed));

    // Partition "b" is never reached
    assert_eq!(
        events.count(|e| matches!(e, CrawlEvent::PartitionStarted { .. })),
        1
    );
    assert_eq!(
        events.count(|e| matches!(
            e,
            CrawlEvent::PartitionFinished {
                end: PartitionEnd::CapReached,
                pages: 2,
                ..
            }
        )),
        1
    );

    // One page delay, between page 1 and page 2
    let slept = sleeper.recorded();
    assert_eq!(slept.len(), 1);
    assert!(slept[0] >= Duration::from_secs(10) && slept[0] <= Duration::from_secs(20));
}

#[tokio::test]
async fn test_duplicates_across_pages_are_skipped() {
    let server = MockServer::start().await;
    mount_listing(&server, "a", 1, &[1, 2]).await;
    mount_listing(&server, "a", 2, &[3, 2]).await;
    mount_end_of_listing(&server, "a").await;
    mount_details(&server, 1..=2).await;
    // Same title and address as item 1 under a different url
    mount_detail(&server, 3, "Flat 1", "Street 1").await;

    let sink = MemorySink::new();
    let events = Arc::new(EventLog::new());
    let mut coordinator =
        Coordinator::builder(create_test_config(&server, &["a"]), Box::new(sink.clone()))
            .sleeper(Arc::new(RecordingSleeper::new()))
            .observer(events.clone())
            .build()
            .unwrap();

    let summary = coordinator.run().await.unwrap();

    assert_eq!(summary.accepted, 2);
    assert_eq!(summary.duplicates, 2);
    assert_eq!(summary.pages_fetched, 3);
    assert_eq!(summary.stop_reason, Some(StopReason::PartitionsExhausted));
    assert_eq!(urls(&server, &sink.records()), vec!["1", "2"]);
    assert_eq!(
        events.count(|e| matches!(e, CrawlEvent::DuplicateSkipped { .. })),
        2
    );
}

#[tokio::test]
async fn test_exhausted_detail_is_skipped() {
    let server = MockServer::start().await;
    mount_listing(&server, "a", 1, &[1, 2, 3]).await;
    mount_end_of_listing(&server, "a").await;
    mount_details(&server, [1, 3]).await;
    Mock::given(method("GET"))
        .and(path("/item/2"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let sink = MemorySink::new();
    let sleeper = Arc::new(RecordingSleeper::new());
    let events = Arc::new(EventLog::new());
    let mut coordinator =
        Coordinator::builder(create_test_config(&server, &["a"]), Box::new(sink.clone()))
            .sleeper(sleeper.clone())
            .observer(events.clone())
            .build()
            .unwrap();

    let summary = coordinator.run().await.unwrap();

    assert_eq!(summary.accepted, 2);
    assert_eq!(summary.detail_failures, 1);
    assert_eq!(urls(&server, &sink.records()), vec!["1", "3"]);
    assert_eq!(
        events.count(|e| matches!(e, CrawlEvent::DetailSkipped { attempts: 3, .. })),
        1
    );
    // Two backoffs for item 2, then one page delay
    assert_eq!(sleeper.recorded().len(), 3);
}

#[tokio::test]
async fn test_empty_first_page_moves_to_next_partition() {
    let server = MockServer::start().await;
    mount_end_of_listing(&server, "a").await;
    mount_listing(&server, "b", 1, &[1]).await;
    mount_end_of_listing(&server, "b").await;
    mount_details(&server, [1]).await;

    let sink = MemorySink::new();
    let events = Arc::new(EventLog::new());
    let mut coordinator = Coordinator::builder(
        create_test_config(&server, &["a", "b"]),
        Box::new(sink.clone()),
    )
    .sleeper(Arc::new(RecordingSleeper::new()))
    .observer(events.clone())
    .build()
    .unwrap();

    let summary = coordinator.run().await.unwrap();

    assert_eq!(summary.accepted, 1);
    assert_eq!(summary.partitions_completed, 2);
    assert_eq!(
        events.count(|e| matches!(
            e,
            CrawlEvent::PartitionFinished { partition, pages: 1, end: PartitionEnd::NoLinks }
                if partition == "a"
        )),
        1
    );
}

#[tokio::test]
async fn test_missing_field_skips_link() {
    let server = MockServer::start().await;
    mount_listing(&server, "a", 1, &[1, 2, 3]).await;
    mount_listing(&server, "a", 2, &[1, 9]).await;
    mount_end_of_listing(&server, "a").await;
    mount_details(&server, [2]).await;

    let without_price = |title: &str, address: &str| {
        detail_html(title, address).replace("js-item-price", "x")
    };
    // Item 1 has no price the first time it is fetched, then a full page
    Mock::given(method("GET"))
        .and(path("/item/1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(without_price("Flat 1", "Street 1")),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_detail(&server, 1, "Flat 1", "Street 1").await;
    // Item 3 never has a price; item 9 carries the same title and address
    Mock::given(method("GET"))
        .and(path("/item/3"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(without_price("Flat 9", "Street 9")),
        )
        .mount(&server)
        .await;
    mount_detail(&server, 9, "Flat 9", "Street 9").await;

    let sink = MemorySink::new();
    let events = Arc::new(EventLog::new());
    let mut coordinator =
        Coordinator::builder(create_test_config(&server, &["a"]), Box::new(sink.clone()))
            .sleeper(Arc::new(RecordingSleeper::new()))
            .observer(events.clone())
            .build()
            .unwrap();

    let summary = coordinator.run().await.unwrap();

    // Failed extractions leave no trace in the seen set
    assert_eq!(summary.accepted, 3);
    assert_eq!(summary.extraction_failures, 2);
    assert_eq!(summary.duplicates, 0);
    assert_eq!(urls(&server, &sink.records()), vec!["2", "1", "9"]);
    assert_eq!(
        events.count(|e| matches!(e, CrawlEvent::ExtractionSkipped { field: "price", .. })),
        2
    );
}

#[tokio::test]
async fn test_throttled_listing_recovers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/a/list"))
        .and(query_param("p", "1"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_listing(&server, "a", 1, &[1]).await;
    mount_end_of_listing(&server, "a").await;
    mount_details(&server, [1]).await;

    let sink = MemorySink::new();
    let sleeper = Arc::new(RecordingSleeper::new());
    let events = Arc::new(EventLog::new());
    let mut coordinator =
        Coordinator::builder(create_test_config(&server, &["a"]), Box::new(sink.clone()))
            .sleeper(sleeper.clone())
            .observer(events.clone())
            .build()
            .unwrap();

    let summary = coordinator.run().await.unwrap();

    assert_eq!(summary.accepted, 1);
    assert_eq!(summary.listing_failures, 0);
    assert_eq!(sleeper.recorded()[0], Duration::from_secs(30));
    assert_eq!(
        events.count(|e| matches!(e, CrawlEvent::AttemptThrottled { .. })),
        1
    );
}

#[tokio::test]
async fn test_flush_failure_is_fatal() {
    let server = MockServer::start().await;
    mount_listing(&server, "a", 1, &[1, 2, 3]).await;
    mount_details(&server, 1..=2).await;
    Mock::given(method("GET"))
        .and(path("/item/3"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = create_test_config(&server, &["a"]);
    config.crawler.batch_size = 2;

    let sink = MemorySink::failing_at(1);
    let events = Arc::new(EventLog::new());
    let mut coordinator = Coordinator::builder(config, Box::new(sink.clone()))
        .sleeper(Arc::new(RecordingSleeper::new()))
        .observer(events.clone())
        .build()
        .unwrap();

    let result = coordinator.run().await;

    assert!(matches!(result, Err(SweepError::Flush(_))));
    assert_eq!(coordinator.phase(), CrawlPhase::Stopped);
    assert_eq!(coordinator.summary().stop_reason, Some(StopReason::Failed));
    assert!(sink.batches().is_empty());
    assert_eq!(sink.closed_with(), Some(RunStatus::Failed));
    assert_eq!(
        events.count(|e| matches!(
            e,
            CrawlEvent::RunStopped {
                reason: StopReason::Failed,
                accepted: 1
            }
        )),
        1
    );
}

async fn requests_to(server: &MockServer, target: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path() == target)
        .count()
}

#[tokio::test]
async fn test_flush_failure_stops_inflight_fetches() {
    let server = MockServer::start().await;
    mount_listing(&server, "a", 1, &[1, 2]).await;
    mount_details(&server, [1]).await;
    // Item 2 keeps failing slowly, so its retries would outlive the run
    Mock::given(method("GET"))
        .and(path("/item/2"))
        .respond_with(ResponseTemplate::new(503).set_delay(Duration::from_millis(200)))
        .mount(&server)
        .await;

    let mut config = create_test_config(&server, &["a"]);
    config.crawler.batch_size = 1;
    config.crawler.detail_concurrency = 2;

    let sink = MemorySink::failing_at(1);
    let mut coordinator = Coordinator::builder(config, Box::new(sink.clone()))
        .sleeper(Arc::new(RecordingSleeper::new()))
        .build()
        .unwrap();

    let result = coordinator.run().await;
    assert!(matches!(result, Err(SweepError::Flush(_))));
    assert_eq!(coordinator.phase(), CrawlPhase::Stopped);

    let at_stop = requests_to(&server, "/item/2").await;
    assert!(at_stop <= 1);

    tokio::time::sleep(Duration::from_millis(800)).await;
    assert_eq!(requests_to(&server, "/item/2").await, at_stop);
}

#[tokio::test]
async fn test_cancellation_drains_accepted_records() {
    let server = MockServer::start().await;
    mount_listing(&server, "a", 1, &[1, 2, 3, 4, 5]).await;
    mount_listing(&server, "a", 2, &[6]).await;
    mount_details(&server, 1..=6).await;

    let mut config = create_test_config(&server, &["a", "b"]);
    config.crawler.batch_size = 2;

    let token = CancellationToken::new();
    let sink = MemorySink::new();
    let mut coordinator = Coordinator::builder(config, Box::new(sink.clone()))
        .sleeper(Arc::new(RecordingSleeper::new()))
        .observer(Arc::new(CancelAfter {
            token: token.clone(),
            after: 3,
        }))
        .cancellation(token)
        .build()
        .unwrap();

    let summary = coordinator.run().await.unwrap();

    assert_eq!(summary.stop_reason, Some(StopReason::Cancelled));
    assert_eq!(summary.accepted, 3);
    assert_eq!(summary.pages_fetched, 1);

    let sizes: Vec<usize> = sink.batches().iter().map(|b| b.records.len()).collect();
    assert_eq!(sizes, vec![2, 1]);
    assert_eq!(sink.closed_with(), Some(RunStatus::Interrupted));
}

#[tokio::test]
async fn test_concurrent_details_match_sequential_run() {
    let server = MockServer::start().await;
    mount_listing(&server, "a", 1, &[1, 2, 3, 4, 5, 6]).await;
    mount_listing(&server, "a", 2, &[2, 8, 7, 9]).await;
    mount_end_of_listing(&server, "a").await;
    mount_details(&server, 1..=7).await;
    mount_detail(&server, 8, "Flat 4", "Street 4").await;

    let mut results = Vec::new();
    for concurrency in [1, 4] {
        let mut config = create_test_config(&server, &["a"]);
        config.crawler.detail_concurrency = concurrency;
        config.crawler.batch_size = 3;
        config.crawler.record_cap = 7;

        let sink = MemorySink::new();
        let mut coordinator = Coordinator::builder(config, Box::new(sink.clone()))
            .sleeper(Arc::new(RecordingSleeper::new()))
            .build()
            .unwrap();
        let summary = coordinator.run().await.unwrap();

        assert_eq!(summary.accepted, 7);
        assert_eq!(summary.duplicates, 2);
        assert_eq!(summary.stop_reason, Some(StopReason::CapReached));
        results.push(urls(&server, &sink.records()));
    }

    assert_eq!(results[0], vec!["1", "2", "3", "4", "5", "6", "7"]);
    assert_eq!(results[0], results[1]);
}

#[tokio::test]
async fn test_sqlite_sink_end_to_end() {
    let server = MockServer::start().await;
    mount_listing(&server, "a", 1, &[1, 2, 3]).await;
    mount_end_of_listing(&server, "a").await;
    mount_details(&server, 1..=3).await;

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = dir.path().join("sweep.db");

    let mut config = create_test_config(&server, &["a"]);
    config.crawler.batch_size = 2;

    let sink = SqliteBatchSink::open(
        Box::new(SqliteStorage::new(&db_path).expect("Failed to open database")),
        "config-hash",
    )
    .unwrap();
    let run_id = sink.run_id();

    let mut coordinator = Coordinator::builder(config, Box::new(sink))
        .sleeper(Arc::new(RecordingSleeper::new()))
        .build()
        .unwrap();
    coordinator.run().await.unwrap();
    drop(coordinator);

    let storage = SqliteStorage::new(&db_path).expect("Failed to reopen database");
    let run = storage.get_run(run_id).unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.config_hash, "config-hash");

    let batches = storage.get_batches(run_id).unwrap();
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0].record_count, 2);
    assert_eq!(batches[1].record_count, 1);

    let second = storage.get_batch_records(run_id, 2).unwrap();
    assert_eq!(second[0].title, "Flat 3");
}

#[tokio::test]
async fn test_xml_sink_end_to_end() {
    let server = MockServer::start().await;
    mount_listing(&server, "a", 1, &[1, 2, 3]).await;
    mount_end_of_listing(&server, "a").await;
    mount_detail(&server, 1, "Flat & garage", "Street 1").await;
    mount_details(&server, 2..=3).await;

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let mut config = create_test_config(&server, &["a"]);
    config.crawler.batch_size = 2;

    let sink = XmlBatchSink::new(dir.path(), "ads");
    let mut coordinator = Coordinator::builder(config, Box::new(sink))
        .sleeper(Arc::new(RecordingSleeper::new()))
        .build()
        .unwrap();
    coordinator.run().await.unwrap();

    let first = std::fs::read_to_string(dir.path().join("ads_1.xml")).unwrap();
    assert_eq!(first.matches("<ad>").count(), 2);
    assert!(first.contains("<title>Flat &amp; garage</title>"));
    assert!(first.contains("<area>unspecified</area>"));

    let second = std::fs::read_to_string(dir.path().join("ads_2.xml")).unwrap();
    assert_eq!(second.matches("<ad>").count(), 1);
    assert!(!dir.path().join("ads_3.xml").exists());
}
