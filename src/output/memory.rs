//! In-memory batch sink
//!
//! Keeps every persisted batch in a shared vector. Clones share the same
//! storage, so a caller can hand one clone to the crawler and inspect the
//! other afterwards.

use crate::output::traits::{Batch, BatchSink};
use crate::record::Record;
use crate::storage::RunStatus;
use crate::FlushError;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct Shared {
    batches: Vec<Batch>,
    closed: Option<RunStatus>,
}

/// Batch sink backed by a shared `Vec`
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    shared: Arc<Mutex<Shared>>,
    fail_at: Option<u32>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that rejects the batch with the given index and every later one
    pub fn failing_at(index: u32) -> Self {
        Self {
            shared: Arc::default(),
            fail_at: Some(index),
        }
    }

    /// Batches persisted so far, in flush order
    pub fn batches(&self) -> Vec<Batch> {
        self.lock().batches.clone()
    }

    /// Every persisted record, in flush order
    pub fn records(&self) -> Vec<Record> {
        self.lock()
            .batches
            .iter()
            .flat_map(|b| b.records.iter().cloned())
            .collect()
    }

    /// Status passed to `close`, if it has been called
    pub fn closed_with(&self) -> Option<RunStatus> {
        self.lock().closed
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl BatchSink for MemorySink {
    fn persist(&mut self, batch: &Batch) -> Result<(), FlushError> {
        if matches!(self.fail_at, Some(limit) if batch.index >= limit) {
            return Err(FlushError::Storage {
                batch: batch.index,
                message: "sink rejected batch".to_string(),
            });
        }
        self.lock().batches.push(batch.clone());
        Ok(())
    }

    fn close(&mut self, status: RunStatus) -> Result<(), FlushError> {
        self.lock().closed = Some(status);
        Ok(())
    }
}
