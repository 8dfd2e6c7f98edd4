//! Output module for persisting records and reporting on a crawl
//!
//! This module handles:
//! - Rotating accepted records into numbered batches
//! - Writing batches to XML files or the SQLite database
//! - Generating markdown summaries and database statistics

mod batch_writer;
mod markdown;
mod memory;
mod sqlite_output;
pub mod stats;
mod traits;
mod xml;

pub use batch_writer::BatchWriter;
pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use memory::MemorySink;
pub use sqlite_output::SqliteBatchSink;
pub use stats::{load_statistics, print_statistics, CrawlStatistics};
pub use traits::{Batch, BatchSink, CrawlSummary, FlushReport, StopReason};
pub use xml::XmlBatchSink;

use crate::config::{OutputConfig, OutputFormat};
use crate::storage::StorageResult;

/// Opens the batch sink selected by the `[output]` table
///
/// # Arguments
///
/// * `config` - The output configuration
/// * `config_hash` - Hash stored with the run when the sink is SQLite
///
/// # Returns
///
/// * `Ok(Box<dyn BatchSink>)` - The sink, ready for its first batch
/// * `Err(StorageError)` - The database could not be opened
pub fn open_sink(config: &OutputConfig, config_hash: &str) -> StorageResult<Box<dyn BatchSink>> {
    match config.format {
        OutputFormat::Xml => Ok(Box::new(XmlBatchSink::new(
            &config.directory,
            config.file_prefix.as_str(),
        ))),
        OutputFormat::Sqlite => {
            let storage = crate::storage::open_storage(std::path::Path::new(&config.database_path))?;
            Ok(Box::new(SqliteBatchSink::open(Box::new(storage), config_hash)?))
        }
    }
}
