//! Per-partition pagination cursor

/// Position of the crawl within one partition
///
/// Pages are 1-based and only move forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionCursor {
    pub partition: String,
    pub page: u32,
}

impl PartitionCursor {
    /// Starts a partition at page 1
    pub fn start(partition: impl Into<String>) -> Self {
        Self {
            partition: partition.into(),
            page: 1,
        }
    }

    /// Moves to the next page
    pub fn advance(&mut self) {
        self.page += 1;
    }

    /// Returns true while the cursor is still on the first page
    pub fn is_first_page(&self) -> bool {
        self.page == 1
    }
}
