//! CSV readers for the input rows and the find-replace pairs

use crate::error::{Error, Result};
use crate::pattern::PatternTable;
use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Lazy sequence of rows read from a delimited file
///
/// No header row is assumed and rows may differ in width. Each item is one
/// record with its fields in column order. A blank line is a row with zero
/// fields, so the row count always matches the line structure of the file.
pub struct RowSource<R: Read> {
    reader: csv::Reader<TailTracking<R>>,
    path: PathBuf,
    /// Reader line number after the last record read
    line_mark: u64,
    /// Last record read, with the lines it spans minus its embedded newlines
    lookahead: Option<(Vec<String>, u64)>,
    pending: VecDeque<Result<Vec<String>>>,
    finished: bool,
}

/// Remembers the final byte handed to the csv reader
struct TailTracking<R> {
    inner: R,
    last: Option<u8>,
}

impl<R: Read> Read for TailTracking<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n > 0 {
            self.last = Some(buf[n - 1]);
        }
        Ok(n)
    }
}

impl RowSource<BufReader<File>> {
    /// Open a CSV file for streaming
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(Self::from_reader(BufReader::new(file), path))
    }
}

impl<'a> RowSource<&'a [u8]> {
    /// Read rows from a string (useful for testing)
    pub fn from_content(content: &'a str, source_name: &str) -> Self {
        Self::from_reader(content.as_bytes(), source_name)
    }
}

impl<R: Read> RowSource<R> {
    /// Read rows from any reader; `path` only labels errors
    pub fn from_reader<P: AsRef<Path>>(reader: R, path: P) -> Self {
        // `\n` is the only terminator so every consumed line is counted;
        // the `\r` of a CRLF ending is stripped from the last field
        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true) // Allow varying number of fields
            .terminator(csv::Terminator::Any(b'\n'))
            .from_reader(TailTracking {
                inner: reader,
                last: None,
            });

        Self {
            reader,
            path: path.as_ref().to_path_buf(),
            line_mark: 1,
            lookahead: None,
            pending: VecDeque::new(),
            finished: false,
        }
    }

    /// Path (or name) the rows are read from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read one record and queue every row that is now fully known
    ///
    /// The csv reader skips blank lines, so they are recovered from the line
    /// counter: lines consumed by a read, minus newlines inside quoted
    /// fields, minus the record's own terminator. Whether the final record
    /// has a terminator is only known at end of input, hence the lookahead.
    fn advance(&mut self) {
        let mut record = csv::StringRecord::new();
        match self.reader.read_record(&mut record) {
            Ok(true) => {
                let span = self.take_lines().saturating_sub(embedded_newlines(&record));
                if let Some((prev, prev_span)) = self.lookahead.replace((fields(&record), span)) {
                    self.queue_record(prev, prev_span, true);
                }
            }
            Ok(false) => {
                self.finished = true;
                if let Some((prev, span)) = self.lookahead.take() {
                    let terminated = self.reader.get_ref().last == Some(b'\n');
                    self.queue_record(prev, span, terminated);
                }
                // Blank lines after the last record
                for _ in 0..self.take_lines() {
                    self.pending.push_back(Ok(Vec::new()));
                }
            }
            Err(e) => {
                self.finished = true;
                if let Some((prev, span)) = self.lookahead.take() {
                    self.queue_record(prev, span, true);
                }
                self.pending.push_back(Err(Error::Csv {
                    path: self.path.clone(),
                    source: e,
                }));
            }
        }
    }

    fn take_lines(&mut self) -> u64 {
        let line = self.reader.position().line();
        let lines = line.saturating_sub(self.line_mark);
        self.line_mark = line;
        lines
    }

    fn queue_record(&mut self, row: Vec<String>, span: u64, terminated: bool) {
        let blanks = span.saturating_sub(u64::from(terminated));
        for _ in 0..blanks {
            self.pending.push_back(Ok(Vec::new()));
        }
        self.pending.push_back(Ok(row));
    }
}

impl<R: Read> Iterator for RowSource<R> {
    type Item = Result<Vec<String>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(row) = self.pending.pop_front() {
                return Some(row);
            }
            if self.finished {
                return None;
            }
            self.advance();
        }
    }
}

fn embedded_newlines(record: &csv::StringRecord) -> u64 {
    record.as_slice().bytes().filter(|&b| b == b'\n').count() as u64
}

/// Record fields with a CRLF remainder removed; a line holding only `\r`
/// is a blank row
fn fields(record: &csv::StringRecord) -> Vec<String> {
    let mut fields: Vec<String> = record.iter().map(str::to_string).collect();
    let had_cr = fields.last().is_some_and(|last| last.ends_with('\r'));
    if had_cr {
        if let Some(last) = fields.last_mut() {
            last.pop();
        }
        if fields.len() == 1 && fields[0].is_empty() {
            fields.clear();
        }
    }
    fields
}

/// Load a find-replace file into a pattern table
pub fn load_patterns<P: AsRef<Path>>(path: P) -> Result<PatternTable> {
    load_from_source(RowSource::open(path)?)
}

/// Load find-replace pairs from a string (useful for testing)
pub fn load_patterns_str(content: &str, source_name: &str) -> Result<PatternTable> {
    load_from_source(RowSource::from_content(content, source_name))
}

fn load_from_source<R: Read>(source: RowSource<R>) -> Result<PatternTable> {
    let path = source.path().to_path_buf();
    let rows = source.collect::<Result<Vec<_>>>()?;
    let row_count = rows.len();

    let table = PatternTable::build(rows);

    info!(
        "processed {} rows from {}: {} patterns, {} skipped",
        row_count,
        path.display(),
        table.len(),
        table.skipped()
    );
    for entry in table.entries() {
        debug!(pattern = %entry.pattern, replacement = %entry.replacement, "pattern");
    }

    Ok(table)
}
