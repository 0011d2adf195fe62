//! Full pass: load patterns, stream the input through the engine, write outputs

use crate::config::{create_dir, CommonConfig, Config};
use crate::error::{Error, Result};
use crate::pattern::PatternTable;
use crate::rewrite::transform_row;
use crate::sink::{write_report_file, CsvSink};
use crate::source::{load_patterns, RowSource};
use crate::stats::{RunStatistics, ThroughputMeter};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn, Level};

/// Engine settings for one pass over the rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PassOptions {
    pub case_insensitive: bool,
    /// Lines between throughput samples, 0 disables sampling
    pub throughput_every: u64,
    pub throughput_window: usize,
}

impl From<&CommonConfig> for PassOptions {
    fn from(common: &CommonConfig) -> Self {
        Self {
            case_insensitive: common.case_insensitive,
            throughput_every: common.throughput_every,
            throughput_window: common.throughput_window,
        }
    }
}

/// What a completed run did
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub statistics: RunStatistics,
    /// Distinct patterns in the table
    pub patterns: usize,
    /// Find-replace rows rejected while loading
    pub skipped_patterns: usize,
    pub input_file: PathBuf,
    pub output_file: PathBuf,
    pub stats_file: PathBuf,
}

/// Transform every row from `rows` and write it to `sink`
///
/// Rows are handled one at a time in input order; the sink receives exactly
/// one output row per input row with the same number of cells.
pub fn process_rows<I, W>(
    rows: I,
    table: &mut PatternTable,
    sink: &mut CsvSink<W>,
    options: &PassOptions,
) -> Result<RunStatistics>
where
    I: IntoIterator<Item = Result<Vec<String>>>,
    W: Write,
{
    let mut stats = RunStatistics::new();
    let mut meter = (options.throughput_every > 0).then(|| {
        ThroughputMeter::new(
            options.throughput_every,
            options.throughput_window,
            Instant::now(),
        )
    });

    for row in rows {
        let row = row?;
        let outcome = transform_row(&row, table, options.case_insensitive);
        sink.write_row(&outcome.cells)?;
        stats.record_row(&outcome);

        if let Some(sample) = meter
            .as_mut()
            .and_then(|m| m.observe(&stats, Instant::now()))
        {
            info!(
                "{} lines, {:.0} cells/s (avg {:.0} cells/s)",
                sample.lines, sample.cells_per_sec, sample.smoothed
            );
        }
    }

    sink.flush()?;
    Ok(stats)
}

/// Run the whole find-and-replace job described by `config`
pub fn run(config: &Config) -> Result<RunSummary> {
    let started_at = Utc::now();
    let timer = Instant::now();

    if tracing::enabled!(Level::DEBUG) {
        debug!(
            "effective configuration:\n{}",
            serde_json::to_string_pretty(config)?
        );
    }

    let create_missing = config.common.create_missing;
    let find_replace_path = config.find_replace_path();
    let input_path = config.input_path();
    let output_path = config.output_path();
    let stats_path = config.stats_path();

    let mut table = if find_replace_path.is_file() {
        load_patterns(&find_replace_path)?
    } else if create_missing {
        write_placeholder(&find_replace_path)?;
        warn!(
            "find-replace file {} did not exist, created an empty one",
            find_replace_path.display()
        );
        PatternTable::default()
    } else {
        return Err(Error::MissingPatternSource(find_replace_path));
    };

    if !input_path.is_file() {
        if create_missing {
            write_placeholder(&input_path)?;
            warn!(
                "input file {} did not exist, created an empty one",
                input_path.display()
            );
        }
        return Err(Error::MissingInputSource(input_path));
    }

    ensure_parent(&output_path)?;
    ensure_parent(&stats_path)?;

    let source = RowSource::open(&input_path)?;
    let mut sink = CsvSink::create(&output_path)?;
    let statistics = process_rows(source, &mut table, &mut sink, &PassOptions::from(&config.common))?;

    info!(
        "{} lines processed, {} changed cells, {} replacements (input: {})",
        statistics.lines_processed,
        statistics.cells_changed,
        statistics.replacements_made,
        input_path.display()
    );

    write_report_file(&stats_path, &table.export_report(config.common.report_order))?;
    info!("wrote pattern statistics to {}", stats_path.display());

    Ok(RunSummary {
        started_at,
        elapsed_ms: u64::try_from(timer.elapsed().as_millis()).unwrap_or(u64::MAX),
        statistics,
        patterns: table.len(),
        skipped_patterns: table.skipped(),
        input_file: input_path,
        output_file: output_path,
        stats_file: stats_path,
    })
}

fn write_placeholder(path: &Path) -> Result<()> {
    ensure_parent(path)?;
    fs::write(path, "\n").map_err(|e| Error::FileWrite {
        path: path.to_path_buf(),
        source: e,
    })
}

fn ensure_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => create_dir(parent),
        _ => Ok(()),
    }
}
