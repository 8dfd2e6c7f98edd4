//! State module for tracking crawl progress
//!
//! This module holds the state the coordinator owns for the lifetime of a run.
//!
//! # Components
//!
//! - `CrawlPhase`: The coordinator's state machine phases and legal transitions
//! - `PartitionCursor`: The partition being crawled and its current page
//! - `SeenSet`: Identities of every record accepted so far

mod crawl_phase;
mod partition;
mod seen_set;

// Re-export main types
pub use crawl_phase::CrawlPhase;
pub use partition::PartitionCursor;
pub use seen_set::{Admission, SeenSet};
