//! SQLite-based batch sink
//!
//! This module provides a batch sink that records each run and its
//! batches in the SQLite storage backend.

use crate::output::traits::{Batch, BatchSink};
use crate::storage::{RunStatus, Storage, StorageResult};
use crate::FlushError;

/// SQLite-based batch sink
///
/// A run row is created when the sink is opened. Every batch is stored in
/// its own transaction, and `close` records the run's final status.
pub struct SqliteBatchSink {
    storage: Box<dyn Storage + Send>,
    run_id: i64,
}

impl SqliteBatchSink {
    /// Opens a new run in `storage`
    ///
    /// # Arguments
    ///
    /// * `storage` - The storage backend to use
    /// * `config_hash` - Hash of the configuration driving this run
    pub fn open(mut storage: Box<dyn Storage + Send>, config_hash: &str) -> StorageResult<Self> {
        let run_id = storage.create_run(config_hash)?;
        tracing::info!("Started run {} in database", run_id);
        Ok(Self { storage, run_id })
    }

    /// The run this sink writes into
    pub fn run_id(&self) -> i64 {
        self.run_id
    }
}

impl BatchSink for SqliteBatchSink {
    fn persist(&mut self, batch: &Batch) -> Result<(), FlushError> {
        self.storage
            .insert_batch(self.run_id, batch)
            .map_err(|e| FlushError::Storage {
                batch: batch.index,
                message: e.to_string(),
            })?;

        tracing::info!(
            "Stored batch {} ({} records) for run {}",
            batch.index,
            batch.records.len(),
            self.run_id
        );
        Ok(())
    }

    fn close(&mut self, status: RunStatus) -> Result<(), FlushError> {
        self.storage
            .finish_run(self.run_id, status)
            .map_err(|e| FlushError::Storage {
                batch: 0,
                message: e.to_string(),
            })
    }
}
