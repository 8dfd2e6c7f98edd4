//! Listing-Sweep: a paced crawler for paginated listing sites
//!
//! This crate walks a listing site partition by partition, extracts one
//! record per detail page, drops duplicates and writes the survivors to
//! durable output in fixed-size batches.

pub mod config;
pub mod crawler;
pub mod output;
pub mod record;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Listing-Sweep operations
///
/// Only failures that end a run surface here. Per-page and per-link
/// failures are absorbed by the coordinator.
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Batch flush failed: {0}")]
    Flush(#[from] FlushError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("Invalid phase transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::CrawlPhase,
        to: state::CrawlPhase,
    },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid CSS selector for {field}: {selector}")]
    InvalidSelector { field: String, selector: String },
}

/// Errors produced while fetching a single URL
///
/// `Transient` and `Throttled` describe one failed attempt and never leave
/// the fetcher's retry loop; callers only ever see `Exhausted`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("Transient failure for {url}: {reason}")]
    Transient { url: String, reason: String },

    #[error("Throttled (HTTP 429) for {url}")]
    Throttled { url: String },

    #[error("Gave up on {url} after {attempts} attempts (last: {last})")]
    Exhausted {
        url: String,
        attempts: u32,
        last: String,
    },
}

/// Errors produced while turning a detail page into a record
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("Required field missing: {field}")]
    MissingField { field: &'static str },
}

/// Errors produced while persisting a batch
#[derive(Debug, Error)]
pub enum FlushError {
    #[error("IO error while writing batch {batch}: {source}")]
    Io {
        batch: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("XML encoding failed for batch {batch}: {source}")]
    Xml {
        batch: u32,
        #[source]
        source: quick_xml::Error,
    },

    #[error("Storage error while writing batch {batch}: {message}")]
    Storage { batch: u32, message: String },

    #[error("Batch writer is already closed")]
    Closed,
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Template is missing the {0} placeholder")]
    MissingPlaceholder(&'static str),
}

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::Coordinator;
pub use output::{CrawlSummary, StopReason};
pub use record::Record;
pub use state::{Admission, CrawlPhase, SeenSet};
