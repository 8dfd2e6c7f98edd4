use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Listing-Sweep
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub governor: GovernorConfig,
    #[serde(default)]
    pub extractor: ExtractorConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Crawl scope and batching
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Partitions crawled in listed order (e.g. region codes)
    pub partitions: Vec<String>,

    /// Listing URL with `{partition}` and `{page}` placeholders
    #[serde(rename = "listing-url-template")]
    pub listing_url_template: String,

    /// Records per flushed batch
    #[serde(rename = "batch-size", default = "default_batch_size")]
    pub batch_size: usize,

    /// Hard ceiling on accepted records for one run
    #[serde(rename = "record-cap", default = "default_record_cap")]
    pub record_cap: usize,

    /// Detail pages fetched at once for a single listing page
    #[serde(rename = "detail-concurrency", default = "default_detail_concurrency")]
    pub detail_concurrency: usize,

    /// Seed for delay jitter and user-agent rotation
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Per-request behavior of the fetcher
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    /// Attempts per URL, including the first one
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(rename = "request-timeout-ms", default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Sleep after an HTTP 429 before the next attempt
    #[serde(rename = "throttle-cooldown-ms", default = "default_throttle_cooldown_ms")]
    pub throttle_cooldown_ms: u64,

    #[serde(rename = "backoff-min-ms", default = "default_delay_min_ms")]
    pub backoff_min_ms: u64,

    #[serde(rename = "backoff-max-ms", default = "default_delay_max_ms")]
    pub backoff_max_ms: u64,

    /// Identity pool; one is picked at random for every attempt
    #[serde(rename = "user-agents", default = "default_user_agents")]
    pub user_agents: Vec<String>,
}

/// Self-imposed pacing between requests
#[derive(Debug, Clone, Deserialize)]
pub struct GovernorConfig {
    #[serde(rename = "page-delay-min-ms", default = "default_delay_min_ms")]
    pub page_delay_min_ms: u64,

    #[serde(rename = "page-delay-max-ms", default = "default_delay_max_ms")]
    pub page_delay_max_ms: u64,

    /// Minimum gap between any two outbound requests (0 disables)
    #[serde(rename = "request-spacing-ms", default)]
    pub request_spacing_ms: u64,
}

/// CSS selectors used by the bundled page extractor
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractorConfig {
    /// Listing item container; its first `<a href>` is the detail link
    #[serde(rename = "listing-item", default = "default_listing_item")]
    pub listing_item: String,

    #[serde(default = "default_title")]
    pub title: String,

    #[serde(default = "default_price")]
    pub price: String,

    #[serde(default = "default_address")]
    pub address: String,

    #[serde(default = "default_area")]
    pub area: String,

    #[serde(default = "default_published")]
    pub published: String,

    /// Value stored when the area selector matches nothing
    #[serde(rename = "area-fallback", default = "default_area_fallback")]
    pub area_fallback: String,
}

/// Batch sink format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Xml,
    Sqlite,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_format")]
    pub format: OutputFormat,

    /// Directory receiving `<prefix>_<n>.xml` files
    #[serde(default = "default_directory")]
    pub directory: String,

    #[serde(rename = "file-prefix", default = "default_file_prefix")]
    pub file_prefix: String,

    /// Path to the SQLite database file
    #[serde(rename = "database-path", default = "default_database_path")]
    pub database_path: String,

    /// Markdown run report, written when set
    #[serde(rename = "summary-path", default)]
    pub summary_path: Option<String>,
}

impl FetcherConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn throttle_cooldown(&self) -> Duration {
        Duration::from_millis(self.throttle_cooldown_ms)
    }
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            request_timeout_ms: default_request_timeout_ms(),
            throttle_cooldown_ms: default_throttle_cooldown_ms(),
            backoff_min_ms: default_delay_min_ms(),
            backoff_max_ms: default_delay_max_ms(),
            user_agents: default_user_agents(),
        }
    }
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            page_delay_min_ms: default_delay_min_ms(),
            page_delay_max_ms: default_delay_max_ms(),
            request_spacing_ms: 0,
        }
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            listing_item: default_listing_item(),
            title: default_title(),
            price: default_price(),
            address: default_address(),
            area: default_area(),
            published: default_published(),
            area_fallback: default_area_fallback(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            directory: default_directory(),
            file_prefix: default_file_prefix(),
            database_path: default_database_path(),
            summary_path: None,
        }
    }
}

fn default_batch_size() -> usize {
    2000
}

fn default_record_cap() -> usize {
    6000
}

fn default_detail_concurrency() -> usize {
    1
}

fn default_max_attempts() -> u32 {
    3
}

fn default_request_timeout_ms() -> u64 {
    15_000
}

fn default_throttle_cooldown_ms() -> u64 {
    30_000
}

fn default_delay_min_ms() -> u64 {
    10_000
}

fn default_delay_max_ms() -> u64 {
    20_000
}

fn default_user_agents() -> Vec<String> {
    vec![
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36".to_string(),
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/89.0.4389.82 Safari/537.36".to_string(),
        "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:89.0) Gecko/20100101 Firefox/89.0".to_string(),
    ]
}

fn default_listing_item() -> String {
    "div.iva-item-root-_lk9K".to_string()
}

fn default_title() -> String {
    "h1.title-info-title-text".to_string()
}

fn default_price() -> String {
    "span.js-item-price".to_string()
}

fn default_address() -> String {
    "span.item-address__string".to_string()
}

fn default_area() -> String {
    "li.params-paramsList__item".to_string()
}

fn default_published() -> String {
    "div.title-info-metadata-item-redesign".to_string()
}

fn default_area_fallback() -> String {
    "unspecified".to_string()
}

fn default_format() -> OutputFormat {
    OutputFormat::Xml
}

fn default_directory() -> String {
    "./output".to_string()
}

fn default_file_prefix() -> String {
    "ads".to_string()
}

fn default_database_path() -> String {
    "./listings.db".to_string()
}
