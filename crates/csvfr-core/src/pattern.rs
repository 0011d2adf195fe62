//! Pattern table: ordered find/replace pairs with per-pattern match counters

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::HashMap;
use tracing::{debug, warn};

/// A single find/replace pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternEntry {
    /// Literal substring to search for (never empty)
    pub pattern: String,
    /// Literal text substituted for every occurrence
    pub replacement: String,
    /// Number of occurrences replaced so far
    pub match_count: u64,
    /// Position of the first row that introduced this pattern
    pub source_order: usize,
}

impl PatternEntry {
    /// Create a new entry with a zero counter
    pub fn new(
        pattern: impl Into<String>,
        replacement: impl Into<String>,
        source_order: usize,
    ) -> Self {
        Self {
            pattern: pattern.into(),
            replacement: replacement.into(),
            match_count: 0,
            source_order,
        }
    }

    /// Pattern length in characters, the sort key of the matching order
    pub fn pattern_len(&self) -> usize {
        self.pattern.chars().count()
    }
}

/// Order in which a report lists the table's entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportOrder {
    /// Order of first appearance in the find-replace source
    #[default]
    Insertion,
    /// Descending pattern length, the order used while matching
    Length,
}

/// One line of the final statistics report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub pattern: String,
    pub replacement: String,
    pub match_count: u64,
}

/// The ordered set of find/replace pairs used for a run
///
/// Entries are kept in matching order (longest pattern first, ties by
/// insertion order). A separate index maps pattern text to its position so
/// lookups never depend on iteration order.
#[derive(Debug, Clone, Default)]
pub struct PatternTable {
    entries: Vec<PatternEntry>,
    index: HashMap<String, usize>,
    skipped: usize,
}

impl PatternTable {
    /// Build a table from raw rows of a find-replace source
    ///
    /// The first field of each row is the pattern and the second the
    /// replacement; extra fields are ignored. Rows with fewer than two
    /// fields, or with an empty pattern, are skipped and counted.
    /// A repeated pattern takes the later replacement but keeps the
    /// position where it was first seen.
    pub fn build<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = Vec<String>>,
    {
        let mut table = Self::default();

        for (row_idx, mut row) in rows.into_iter().enumerate() {
            if row.len() < 2 || row[0].is_empty() {
                warn!(
                    "ignoring find-replace row {}: needs a non-empty pattern and a replacement",
                    row_idx + 1
                );
                debug!(?row, "ignored row");
                table.skipped += 1;
                continue;
            }

            row.truncate(2);
            let replacement = row.pop().unwrap_or_default();
            let pattern = row.pop().unwrap_or_default();

            match table.index.get(&pattern) {
                Some(&idx) => table.entries[idx].replacement = replacement,
                None => {
                    let order = table.entries.len();
                    table.index.insert(pattern.clone(), order);
                    table
                        .entries
                        .push(PatternEntry::new(pattern, replacement, order));
                }
            }
        }

        // Stable: equal lengths keep first-seen order
        table.entries.sort_by_key(|e| Reverse(e.pattern_len()));
        table.reindex();
        table
    }

    /// Build a table from already well-formed pairs
    pub fn from_pairs<I, P, R>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (P, R)>,
        P: Into<String>,
        R: Into<String>,
    {
        Self::build(
            pairs
                .into_iter()
                .map(|(p, r)| vec![p.into(), r.into()]),
        )
    }

    fn reindex(&mut self) {
        self.index = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.pattern.clone(), i))
            .collect();
    }

    /// Number of distinct patterns
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the table holds no patterns
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of source rows rejected while building
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Entries in matching order
    pub fn entries(&self) -> &[PatternEntry] {
        &self.entries
    }

    /// Find an entry by its pattern text
    pub fn get(&self, pattern: &str) -> Option<&PatternEntry> {
        self.index.get(pattern).map(|&i| &self.entries[i])
    }

    /// Add `count` matches to the counter of `pattern`
    pub fn record_match(&mut self, pattern: &str, count: u64) -> Result<()> {
        let idx = *self
            .index
            .get(pattern)
            .ok_or_else(|| Error::UnknownPattern(pattern.to_string()))?;
        self.record_match_at(idx, count);
        Ok(())
    }

    /// Add `count` matches to the entry at `idx` in matching order
    pub(crate) fn record_match_at(&mut self, idx: usize, count: u64) {
        self.entries[idx].match_count += count;
    }

    /// Sum of all per-pattern counters
    pub fn total_matches(&self) -> u64 {
        self.entries.iter().map(|e| e.match_count).sum()
    }

    /// Export `(pattern, replacement, match_count)` triples in the given order
    pub fn export_report(&self, order: ReportOrder) -> Vec<ReportEntry> {
        let mut sorted: Vec<&PatternEntry> = self.entries.iter().collect();
        if order == ReportOrder::Insertion {
            sorted.sort_by_key(|e| e.source_order);
        }

        sorted
            .into_iter()
            .map(|e| ReportEntry {
                pattern: e.pattern.clone(),
                replacement: e.replacement.clone(),
                match_count: e.match_count,
            })
            .collect()
    }
}
