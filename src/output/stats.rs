//! Statistics generation from the output database
//!
//! This module provides functionality for extracting and displaying
//! run statistics from the storage layer.

use crate::storage::{RunRecord, Storage, StorageResult};

/// Database statistics summary
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    /// Number of recorded runs
    pub total_runs: u64,

    /// Batches stored across all runs
    pub total_batches: u64,

    /// Records stored across all runs
    pub total_records: u64,

    /// Most recent run, if any
    pub latest_run: Option<RunRecord>,

    /// Records stored by the most recent run
    pub latest_run_records: u64,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(CrawlStatistics)` - Successfully loaded statistics
/// * `Err(StorageError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> StorageResult<CrawlStatistics> {
    let total_runs = storage.count_runs()?;
    let total_batches = storage.count_batches()?;
    let total_records = storage.count_records()?;

    let latest_run = storage.get_latest_run()?;
    let latest_run_records = match &latest_run {
        Some(run) => storage.count_records_for_run(run.id)?,
        None => 0,
    };

    Ok(CrawlStatistics {
        total_runs,
        total_batches,
        total_records,
        latest_run,
        latest_run_records,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Listing-Sweep Statistics ===\n");

    println!("Overview:");
    println!("  Runs recorded: {}", stats.total_runs);
    println!("  Batches stored: {}", stats.total_batches);
    println!("  Records stored: {}", stats.total_records);
    println!();

    match &stats.latest_run {
        Some(run) => {
            println!("Latest Run (#{}):", run.id);
            println!("  Status: {}", run.status.to_db_string());
            println!("  Started: {}", run.started_at);
            if let Some(finished) = &run.finished_at {
                println!("  Finished: {}", finished);
            }
            println!("  Config hash: {}", run.config_hash);
            println!("  Records: {}", stats.latest_run_records);
        }
        None => println!("No runs recorded yet."),
    }
}
