//! CSV writers for the transformed rows and the statistics report
//!
//! Both outputs share one dialect: every field quoted, `,` between fields,
//! embedded quotes doubled, and `\r\n` after every record.

use crate::error::{Error, Result};
use crate::pattern::ReportEntry;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Field delimiter of every file we write
pub const DELIMITER: u8 = b',';

/// Row sink writing the fixed output dialect
pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
    path: PathBuf,
    rows_written: u64,
}

impl CsvSink<BufWriter<File>> {
    /// Create (or truncate) a file and write rows to it
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| Error::FileWrite {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(Self::from_writer(BufWriter::new(file), path))
    }
}

impl<W: Write> CsvSink<W> {
    /// Write rows to any writer; `path` only labels errors
    pub fn from_writer<P: AsRef<Path>>(writer: W, path: P) -> Self {
        let writer = csv::WriterBuilder::new()
            .delimiter(DELIMITER)
            .quote_style(csv::QuoteStyle::Always)
            .double_quote(true)
            .terminator(csv::Terminator::CRLF)
            .flexible(true)
            .from_writer(writer);

        Self {
            writer,
            path: path.as_ref().to_path_buf(),
            rows_written: 0,
        }
    }

    /// Write one row, fields in order
    ///
    /// A row without fields is written as a bare `\r\n`.
    pub fn write_row<I, S>(&mut self, row: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        let mut fields = row.into_iter().peekable();
        if fields.peek().is_none() {
            self.write_empty_row()?;
        } else {
            self.writer.write_record(fields).map_err(|e| self.csv_error(e))?;
        }
        self.rows_written += 1;
        Ok(())
    }

    // The csv writer would emit `""` for an empty record
    fn write_empty_row(&mut self) -> Result<()> {
        self.writer
            .flush()
            .and_then(|()| self.writer.get_mut().write_all(b"\r\n"))
            .map_err(|e| Error::FileWrite {
                path: self.path.clone(),
                source: e,
            })
    }

    /// Number of rows written so far
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Flush buffered rows to the underlying writer
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush().map_err(|e| Error::FileWrite {
            path: self.path.clone(),
            source: e,
        })
    }

    /// Flush and return the underlying writer
    pub fn into_inner(self) -> Result<W> {
        let path = self.path;
        self.writer.into_inner().map_err(|e| Error::FileWrite {
            path,
            source: e.into_error(),
        })
    }

    fn csv_error(&self, source: csv::Error) -> Error {
        Error::Csv {
            path: self.path.clone(),
            source,
        }
    }
}

/// Write `(pattern, replacement, match_count)` triples to a sink
pub fn write_report<W: Write>(sink: &mut CsvSink<W>, report: &[ReportEntry]) -> Result<()> {
    for entry in report {
        let count = entry.match_count.to_string();
        sink.write_row([
            entry.pattern.as_str(),
            entry.replacement.as_str(),
            count.as_str(),
        ])?;
    }
    sink.flush()
}

/// Write a statistics report file
pub fn write_report_file<P: AsRef<Path>>(path: P, report: &[ReportEntry]) -> Result<()> {
    let mut sink = CsvSink::create(path)?;
    write_report(&mut sink, report)
}
