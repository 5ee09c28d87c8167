//! CSV result sink.
//!
//! Every field is double-quoted with inner quotes doubled, one record per
//! line. The writer is flushed after every row, and for files the flush
//! also commits the data to disk, so completed rows survive a crash.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;

use csv::{QuoteStyle, Terminator, WriterBuilder};
use tracing::info;

use crate::error::{EnrichError, SinkError, SinkResult};
use crate::traits::sink::ResultSink;
use crate::types::row::{ResultRow, RESULT_HEADER};

/// A file whose `flush` also syncs its data to disk.
pub struct SyncedFile(File);

impl Write for SyncedFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()?;
        self.0.sync_data()
    }
}

/// Appends result rows as quoted CSV lines.
pub struct CsvSink<W: Write> {
    writer: Mutex<csv::Writer<W>>,
}

impl CsvSink<SyncedFile> {
    /// Create (or truncate) `path`, optionally writing the header line.
    pub fn create(path: &Path, header: bool) -> Result<Self, EnrichError> {
        let file = File::create(path).map_err(|source| EnrichError::OutputCreate {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "Output file created");

        let sink = Self::from_writer(SyncedFile(file));
        if header {
            sink.write_header().map_err(EnrichError::OutputHeader)?;
        }
        Ok(sink)
    }
}

impl<W: Write> CsvSink<W> {
    pub fn from_writer(inner: W) -> Self {
        let writer = WriterBuilder::new()
            .has_headers(false)
            .quote_style(QuoteStyle::Always)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(inner);
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Write the fixed header line.
    pub fn write_header(&self) -> SinkResult<()> {
        let mut writer = self.writer.lock().map_err(|_| SinkError::Poisoned)?;
        writer.write_record(RESULT_HEADER)?;
        writer.flush()?;
        Ok(())
    }

    /// Recover the underlying writer.
    pub fn into_inner(self) -> SinkResult<W> {
        let writer = self.writer.into_inner().map_err(|_| SinkError::Poisoned)?;
        writer
            .into_inner()
            .map_err(|e| SinkError::Io(e.into_error()))
    }
}

impl<W: Write + Send> ResultSink for CsvSink<W> {
    fn write_row(&self, row: &ResultRow) -> SinkResult<()> {
        let mut writer = self.writer.lock().map_err(|_| SinkError::Poisoned)?;
        writer.serialize(row)?;
        writer.flush()?;
        Ok(())
    }
}

/// Parse one output line back into its fields.
pub fn parse_line(line: &str) -> SinkResult<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(line.as_bytes());
    match reader.records().next() {
        Some(record) => Ok(record?.iter().map(str::to_string).collect()),
        None => Ok(Vec::new()),
    }
}
