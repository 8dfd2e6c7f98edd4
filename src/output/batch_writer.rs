//! Batch rotation
//!
//! The writer buffers accepted records and hands a full buffer to its sink
//! as one numbered batch. The residual buffer is flushed by `finish`.

use crate::output::traits::{Batch, BatchSink, FlushReport};
use crate::record::Record;
use crate::storage::RunStatus;
use crate::FlushError;
use std::mem;

/// Buffers records and flushes them in fixed-size batches
pub struct BatchWriter {
    sink: Box<dyn BatchSink>,
    batch_size: usize,
    buffer: Vec<Record>,
    next_index: u32,
    appended: u64,
    closed: bool,
}

impl BatchWriter {
    /// Creates a writer that flushes every `batch_size` records
    ///
    /// A `batch_size` of 0 is treated as 1.
    pub fn new(sink: Box<dyn BatchSink>, batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            sink,
            batch_size,
            buffer: Vec::with_capacity(batch_size.min(4096)),
            next_index: 1,
            appended: 0,
            closed: false,
        }
    }

    /// Buffers one record, flushing when the buffer is full
    ///
    /// # Returns
    ///
    /// * `Ok(Some(report))` - The record completed a batch that was flushed
    /// * `Ok(None)` - The record was buffered
    /// * `Err(FlushError)` - The flush failed; the run must stop
    pub fn append(&mut self, record: Record) -> Result<Option<FlushReport>, FlushError> {
        if self.closed {
            return Err(FlushError::Closed);
        }

        self.buffer.push(record);
        self.appended += 1;

        if self.buffer.len() >= self.batch_size {
            return self.flush();
        }
        Ok(None)
    }

    /// Flushes the residual buffer and closes the sink
    pub fn finish(&mut self, status: RunStatus) -> Result<Option<FlushReport>, FlushError> {
        if self.closed {
            return Err(FlushError::Closed);
        }

        let report = match self.flush() {
            Ok(report) => report,
            Err(e) => {
                self.abort();
                return Err(e);
            }
        };

        self.closed = true;
        self.sink.close(status)?;
        Ok(report)
    }

    /// Closes the sink as failed without flushing the buffer
    pub fn abort(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.sink.close(RunStatus::Failed) {
            tracing::warn!("Failed to close batch sink after error: {}", e);
        }
    }

    /// Records appended since the writer was created
    pub fn total_appended(&self) -> u64 {
        self.appended
    }

    /// Records waiting for the next flush
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Index the next flushed batch will carry
    pub fn next_index(&self) -> u32 {
        self.next_index
    }

    fn flush(&mut self) -> Result<Option<FlushReport>, FlushError> {
        if self.buffer.is_empty() {
            return Ok(None);
        }

        let batch = Batch {
            index: self.next_index,
            records: mem::take(&mut self.buffer),
        };
        self.sink.persist(&batch)?;

        tracing::debug!(
            "Flushed batch {} ({} records)",
            batch.index,
            batch.records.len()
        );

        self.next_index += 1;
        Ok(Some(FlushReport {
            index: batch.index,
            size: batch.records.len(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::MemorySink;

    fn record(n: usize) -> Record {
        Record {
            title: format!("t{}", n),
            price: "1".to_string(),
            address: format!("a{}", n),
            area: "unspecified".to_string(),
            published: "today".to_string(),
            url: format!("https://example.com/{}", n),
        }
    }

    #[test]
    fn test_flushes_full_batches() {
        let sink = MemorySink::new();
        let mut writer = BatchWriter::new(Box::new(sink.clone()), 2);

        assert_eq!(writer.append(record(1)).unwrap(), None);
        assert_eq!(
            writer.append(record(2)).unwrap(),
            Some(FlushReport { index: 1, size: 2 })
        );
        assert_eq!(writer.append(record(3)).unwrap(), None);

        assert_eq!(sink.batches().len(), 1);
        assert_eq!(writer.pending(), 1);
        assert_eq!(writer.next_index(), 2);
    }

    #[test]
    fn test_finish_flushes_residual() {
        let sink = MemorySink::new();
        let mut writer = BatchWriter::new(Box::new(sink.clone()), 2);

        for n in 1..=5 {
            writer.append(record(n)).unwrap();
        }
        let report = writer.finish(RunStatus::Completed).unwrap();
        assert_eq!(report, Some(FlushReport { index: 3, size: 1 }));

        let sizes: Vec<usize> = sink.batches().iter().map(|b| b.records.len()).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
        let indices: Vec<u32> = sink.batches().iter().map(|b| b.index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
        assert_eq!(sink.closed_with(), Some(RunStatus::Completed));
        assert_eq!(writer.total_appended(), 5);
    }

    #[test]
    fn test_finish_with_empty_buffer() {
        let sink = MemorySink::new();
        let mut writer = BatchWriter::new(Box::new(sink.clone()), 2);

        writer.append(record(1)).unwrap();
        writer.append(record(2)).unwrap();
        assert_eq!(writer.finish(RunStatus::Completed).unwrap(), None);
        assert_eq!(sink.batches().len(), 1);
    }

    #[test]
    fn test_append_after_finish() {
        let mut writer = BatchWriter::new(Box::new(MemorySink::new()), 2);
        writer.finish(RunStatus::Completed).unwrap();
        assert!(matches!(writer.append(record(1)), Err(FlushError::Closed)));
    }

    #[test]
    fn test_flush_failure_propagates() {
        let sink = MemorySink::failing_at(1);
        let mut writer = BatchWriter::new(Box::new(sink.clone()), 2);

        writer.append(record(1)).unwrap();
        assert!(matches!(
            writer.append(record(2)),
            Err(FlushError::Storage { batch: 1, .. })
        ));
        assert!(sink.batches().is_empty());
    }

    #[test]
    fn test_residual_flush_failure_closes_as_failed() {
        let sink = MemorySink::failing_at(2);
        let mut writer = BatchWriter::new(Box::new(sink.clone()), 2);

        for n in 1..=3 {
            writer.append(record(n)).unwrap();
        }
        assert!(writer.finish(RunStatus::Completed).is_err());
        assert_eq!(sink.batches().len(), 1);
        assert_eq!(sink.closed_with(), Some(RunStatus::Failed));
    }

    #[test]
    fn test_zero_batch_size_acts_as_one() {
        let sink = MemorySink::new();
        let mut writer = BatchWriter::new(Box::new(sink.clone()), 0);
        assert!(writer.append(record(1)).unwrap().is_some());
    }
}
