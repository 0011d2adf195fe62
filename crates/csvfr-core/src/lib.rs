//! csvfr-core: Core library for bulk find-and-replace across CSV cells
//!
//! This library provides functionality to:
//! - Load find/replace pairs from a two-column CSV file into an ordered table
//! - Rewrite cells by literal substring substitution, longest pattern first
//! - Stream an input CSV through the engine and write a fully quoted copy
//! - Count replacements per pattern and report them as CSV
//! - Bootstrap and load the TOML run configuration

pub mod config;
pub mod error;
pub mod pattern;
pub mod rewrite;
pub mod runner;
pub mod sink;
pub mod source;
pub mod stats;

pub use config::{bootstrap, Config};
pub use error::{Error, Result};
pub use pattern::{PatternEntry, PatternTable, ReportEntry, ReportOrder};
pub use rewrite::{rewrite_cell, transform_row, CellOutcome, RowOutcome};
pub use runner::{process_rows, run, PassOptions, RunSummary};
pub use sink::{write_report, write_report_file, CsvSink};
pub use source::{load_patterns, load_patterns_str, RowSource};
pub use stats::{RunStatistics, ThroughputMeter, ThroughputSample};
