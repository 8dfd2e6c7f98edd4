//! XML file batch sink
//!
//! Each batch becomes `<directory>/<prefix>_<index>.xml`:
//!
//! ```xml
//! <?xml version="1.0" encoding="utf-8"?>
//! <ads><ad><title>..</title><price>..</price><address>..</address>
//! <area>..</area><date>..</date><url>..</url></ad></ads>
//! ```

use crate::output::traits::{Batch, BatchSink};
use crate::record::Record;
use crate::FlushError;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Writes each batch to its own XML file
#[derive(Debug)]
pub struct XmlBatchSink {
    directory: PathBuf,
    prefix: String,
}

impl XmlBatchSink {
    /// Creates a sink writing into `directory`
    ///
    /// The directory is created on the first flush if it does not exist.
    pub fn new(directory: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            prefix: prefix.into(),
        }
    }

    /// Path of the file that holds batch `index`
    pub fn batch_path(&self, index: u32) -> PathBuf {
        self.directory
            .join(format!("{}_{}.xml", self.prefix, index))
    }

    fn write_batch(&self, path: &Path, batch: &Batch) -> Result<(), FlushError> {
        let io_error = |source| FlushError::Io {
            batch: batch.index,
            source,
        };

        fs::create_dir_all(&self.directory).map_err(io_error)?;
        let file = File::create(path).map_err(io_error)?;

        let mut writer = Writer::new(BufWriter::new(file));
        write_ads(&mut writer, &batch.records).map_err(|source| FlushError::Xml {
            batch: batch.index,
            source,
        })?;
        writer.into_inner().flush().map_err(io_error)
    }
}

impl BatchSink for XmlBatchSink {
    fn persist(&mut self, batch: &Batch) -> Result<(), FlushError> {
        let path = self.batch_path(batch.index);
        self.write_batch(&path, batch)?;

        tracing::info!(
            "Wrote {} records to {}",
            batch.records.len(),
            path.display()
        );
        Ok(())
    }
}

/// Writes records as an `<ads>` document, one `<ad>` per record
fn write_ads<W: Write>(writer: &mut Writer<W>, records: &[Record]) -> quick_xml::Result<()> {
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
    writer.write_event(Event::Text(BytesText::new("\n")))?;
    writer.write_event(Event::Start(BytesStart::new("ads")))?;

    for record in records {
        writer.write_event(Event::Start(BytesStart::new("ad")))?;
        write_field(writer, "title", &record.title)?;
        write_field(writer, "price", &record.price)?;
        write_field(writer, "address", &record.address)?;
        write_field(writer, "area", &record.area)?;
        write_field(writer, "date", &record.published)?;
        write_field(writer, "url", &record.url)?;
        writer.write_event(Event::End(BytesEnd::new("ad")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("ads")))?;
    writer.write_event(Event::Text(BytesText::new("\n")))?;
    Ok(())
}

fn write_field<W: Write>(writer: &mut Writer<W>, name: &str, text: &str) -> quick_xml::Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}
