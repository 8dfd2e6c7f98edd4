//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::output::Batch;
use crate::record::Record;
use crate::storage::{BatchRecord, RunRecord, RunStatus};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Batch {index} already stored for run {run_id}")]
    DuplicateBatch { run_id: i64, index: u32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new crawl run in the `running` state
    ///
    /// # Arguments
    ///
    /// * `config_hash` - Hash of the configuration file
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Sets the final status of a run and stamps its finish time
    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    // ===== Batches =====

    /// Stores a batch and its records atomically
    ///
    /// # Returns
    ///
    /// The ID of the stored batch row
    fn insert_batch(&mut self, run_id: i64, batch: &Batch) -> StorageResult<i64>;

    /// Lists the batches of a run in index order
    fn get_batches(&self, run_id: i64) -> StorageResult<Vec<BatchRecord>>;

    /// Loads the records of one batch in their original order
    fn get_batch_records(&self, run_id: i64, batch_index: u32) -> StorageResult<Vec<Record>>;

    // ===== Statistics =====

    fn count_runs(&self) -> StorageResult<u64>;

    fn count_batches(&self) -> StorageResult<u64>;

    fn count_records(&self) -> StorageResult<u64>;

    fn count_records_for_run(&self, run_id: i64) -> StorageResult<u64>;
}
