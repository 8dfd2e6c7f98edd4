//! Record deduplication
//!
//! A candidate is a duplicate when either its url or its (title, address)
//! pair has been accepted earlier in the run. The set only grows.

use crate::record::Record;
use std::collections::HashSet;

/// Outcome of offering a candidate to the [`SeenSet`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// The candidate was new; both of its keys are now recorded
    Accepted(Record),

    /// One of the candidate's keys was already recorded
    Duplicate,
}

/// Identities of every record accepted so far
#[derive(Debug, Default)]
pub struct SeenSet {
    urls: HashSet<String>,
    pairs: HashSet<(String, String)>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks a candidate and records its keys if it is new
    ///
    /// The check and the insert happen under the same `&mut self` borrow, so
    /// no other candidate can interleave between them.
    pub fn admit(&mut self, candidate: Record) -> Admission {
        if self.contains(&candidate) {
            return Admission::Duplicate;
        }

        self.urls.insert(candidate.url.clone());
        self.pairs.insert(candidate.identity());
        Admission::Accepted(candidate)
    }

    /// Returns true if either key of the record has been seen
    pub fn contains(&self, record: &Record) -> bool {
        if self.urls.contains(&record.url) {
            return true;
        }
        self.pairs.contains(&record.identity())
    }

    /// Number of accepted records
    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}
