//! Phase definitions for the crawl state machine

use std::fmt;

/// The phase the coordinator is in
///
/// `Stopped` is the only terminal phase. `Draining` is reachable from every
/// live phase, which lets cancellation and the record cap end a run anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlPhase {
    /// Choosing the next partition from the configured list
    PartitionIterating,

    /// Fetching the listing page at the current cursor
    PageFetching,

    /// Fetching and admitting the detail pages linked from a listing page
    LinkProcessing,

    /// Flushing the residual batch
    Draining,

    /// Terminal; no further fetches
    Stopped,
}

impl CrawlPhase {
    /// Returns true if this is the terminal phase
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped)
    }

    /// Returns true if a transition from `self` to `next` is legal
    pub fn can_transition_to(&self, next: CrawlPhase) -> bool {
        use CrawlPhase::*;
        matches!(
            (self, next),
            (PartitionIterating, PageFetching)
                | (PartitionIterating, Draining)
                | (PageFetching, LinkProcessing)
                | (PageFetching, PartitionIterating)
                | (PageFetching, Draining)
                | (LinkProcessing, PageFetching)
                | (LinkProcessing, Draining)
                | (Draining, Stopped)
        )
    }

    /// Converts the phase to a string for logs and storage
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PartitionIterating => "partition_iterating",
            Self::PageFetching => "page_fetching",
            Self::LinkProcessing => "link_processing",
            Self::Draining => "draining",
            Self::Stopped => "stopped",
        }
    }

    /// Returns every phase (useful for testing)
    pub fn all_phases() -> Vec<CrawlPhase> {
        vec![
            Self::PartitionIterating,
            Self::PageFetching,
            Self::LinkProcessing,
            Self::Draining,
            Self::Stopped,
        ]
    }
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
