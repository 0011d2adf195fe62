//! Substitution engine: rewrites cells and rows against a pattern table

use crate::pattern::PatternTable;

/// Result of rewriting a single cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellOutcome {
    /// Text after every pattern has been applied
    pub text: String,
    /// Occurrences replaced in this cell, summed over all patterns
    pub replacements: u64,
}

/// Result of transforming one row
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RowOutcome {
    /// Rewritten cells, same order and count as the input row
    pub cells: Vec<String>,
    /// Number of cells whose text changed
    pub cells_changed: usize,
    /// Occurrences replaced across the row
    pub replacements: u64,
}

impl RowOutcome {
    /// Check if any cell of the row changed
    pub fn changed(&self) -> bool {
        self.cells_changed > 0
    }
}

/// Apply every pattern of `table`, in matching order, to one cell
///
/// Each pattern sees the output of the previous one, so replacement text can
/// be rewritten again by a later (shorter) pattern. Counters on `table` grow
/// only for patterns that actually changed the text.
pub fn rewrite_cell(cell: &str, table: &mut PatternTable, case_insensitive: bool) -> CellOutcome {
    let mut current = cell.to_string();
    let mut current_chars = current.chars().count();
    let mut replacements = 0;

    for idx in 0..table.len() {
        let entry = &table.entries()[idx];

        let (rewritten, count) = if case_insensitive {
            if entry.pattern_len() > current_chars {
                continue;
            }
            replace_ignore_case(&current, &entry.pattern, &entry.replacement)
        } else {
            if entry.pattern.len() > current.len() {
                continue;
            }
            let count = current.matches(entry.pattern.as_str()).count() as u64;
            if count == 0 {
                continue;
            }
            (current.replace(entry.pattern.as_str(), &entry.replacement), count)
        };

        if count > 0 && rewritten != current {
            replacements += count;
            table.record_match_at(idx, count);
            current = rewritten;
            current_chars = current.chars().count();
        }
    }

    CellOutcome {
        text: current,
        replacements,
    }
}

/// Rewrite every cell of a row independently
pub fn transform_row<S: AsRef<str>>(
    row: &[S],
    table: &mut PatternTable,
    case_insensitive: bool,
) -> RowOutcome {
    let mut outcome = RowOutcome {
        cells: Vec::with_capacity(row.len()),
        ..RowOutcome::default()
    };

    for cell in row {
        let cell = cell.as_ref();
        let rewritten = rewrite_cell(cell, table, case_insensitive);
        if rewritten.text != cell {
            outcome.cells_changed += 1;
        }
        outcome.replacements += rewritten.replacements;
        outcome.cells.push(rewritten.text);
    }

    outcome
}

/// Replace every non-overlapping occurrence of `pattern` in `haystack`,
/// comparing characters through their lowercase mapping
///
/// Unmatched text keeps its case and the replacement is inserted verbatim.
fn replace_ignore_case(haystack: &str, pattern: &str, replacement: &str) -> (String, u64) {
    let needle: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(haystack.len());
    let mut count = 0;
    let mut copied_to = 0;
    let mut pos = 0;

    while pos < haystack.len() {
        match match_len_at(&haystack[pos..], &needle) {
            Some(len) => {
                out.push_str(&haystack[copied_to..pos]);
                out.push_str(replacement);
                count += 1;
                pos += len;
                copied_to = pos;
            }
            None => {
                // Advance one character
                pos += haystack[pos..].chars().next().map_or(1, char::len_utf8);
            }
        }
    }

    if count == 0 {
        return (haystack.to_string(), 0);
    }
    out.push_str(&haystack[copied_to..]);
    (out, count)
}

/// Byte length of the match if `needle` matches at the start of `text`
fn match_len_at(text: &str, needle: &[char]) -> Option<usize> {
    let mut len = 0;
    let mut chars = text.chars();
    for &n in needle {
        let c = chars.next()?;
        if !chars_eq_ignore_case(c, n) {
            return None;
        }
        len += c.len_utf8();
    }
    Some(len)
}

fn chars_eq_ignore_case(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(pairs: &[(&str, &str)]) -> PatternTable {
        PatternTable::from_pairs(pairs.iter().copied())
    }

    #[test]
    fn test_rewrite_food_scenario() {
        let mut t = table(&[("pizza", "fruits"), ("ice cream", "fiber")]);
        let out = rewrite_cell("1 pizza, 1 beer, and 1 ice cream", &mut t, false);

        assert_eq!(out.text, "1 fruits, 1 beer, and 1 fiber");
        assert_eq!(out.replacements, 2);
        assert_eq!(t.get("pizza").unwrap().match_count, 1);
        assert_eq!(t.get("ice cream").unwrap().match_count, 1);
    }

    #[test]
    fn test_rewrite_case_insensitive_scenario() {
        let mut t = table(&[("CaSeiNsensitive", "CamelCase")]);
        let out = rewrite_cell("CAPS cAseInsEnsitIvE lower", &mut t, true);

        assert_eq!(out.text, "CAPS CamelCase lower");
        assert_eq!(out.replacements, 1);
    }

    #[test]
    fn test_case_modes() {
        let mut t = table(&[("foo", "bar")]);
        assert_eq!(rewrite_cell("FOO", &mut t, true).replacements, 1);
        assert_eq!(rewrite_cell("foo", &mut t, true).replacements, 1);

        let out = rewrite_cell("FOO", &mut t, false);
        assert_eq!(out.text, "FOO");
        assert_eq!(out.replacements, 0);
        assert_eq!(t.get("foo").unwrap().match_count, 2);
    }

    #[test]
    fn test_longer_pattern_applied_first() {
        let mut t = table(&[("a", "aa"), ("aa", "b")]);
        let out = rewrite_cell("aa", &mut t, false);

        assert_eq!(out.text, "b");
        assert_eq!(out.replacements, 1);
        assert_eq!(t.get("aa").unwrap().match_count, 1);
        assert_eq!(t.get("a").unwrap().match_count, 0);
    }

    #[test]
    fn test_containing_pattern_not_fragmented() {
        let mut t = table(&[("cat", "dog"), ("concatenate", "join")]);
        let out = rewrite_cell("concatenate the cat", &mut t, false);

        assert_eq!(out.text, "join the dog");
        assert_eq!(out.replacements, 2);
    }

    #[test]
    fn test_replacement_visible_to_later_patterns() {
        let mut t = table(&[("xyz", "ab"), ("a", "c")]);
        let out = rewrite_cell("xyz", &mut t, false);

        assert_eq!(out.text, "cb");
        assert_eq!(out.replacements, 2);
    }

    #[test]
    fn test_counts_every_occurrence() {
        let mut t = table(&[("ab", "X")]);
        let out = rewrite_cell("ab ab abab", &mut t, false);

        assert_eq!(out.text, "X X XX");
        assert_eq!(out.replacements, 4);
        assert_eq!(t.total_matches(), 4);
    }

    #[test]
    fn test_non_overlapping_left_to_right() {
        let mut t = table(&[("aa", "b")]);
        assert_eq!(rewrite_cell("aaa", &mut t, false).text, "ba");
        assert_eq!(rewrite_cell("AAA", &mut t, true).text, "bA");
    }

    #[test]
    fn test_identity_replacement_is_not_counted() {
        let mut t = table(&[("same", "same")]);
        let out = rewrite_cell("same same", &mut t, false);

        assert_eq!(out.text, "same same");
        assert_eq!(out.replacements, 0);
        assert_eq!(t.get("same").unwrap().match_count, 0);
    }

    #[test]
    fn test_case_insensitive_keeps_surrounding_case() {
        let mut t = table(&[("mid", "-")]);
        let out = rewrite_cell("AbMiDcD", &mut t, true);
        assert_eq!(out.text, "Ab-cD");
    }

    #[test]
    fn test_case_insensitive_non_ascii() {
        let mut t = table(&[("straße", "road"), ("привет", "hi")]);
        let out = rewrite_cell("STRAßE / ПРИВЕТ", &mut t, true);

        assert_eq!(out.text, "road / hi");
        assert_eq!(out.replacements, 2);
    }

    #[test]
    fn test_case_insensitive_match_wider_than_pattern() {
        // KELVIN SIGN is three bytes and lowercases to ASCII `k`
        let mut t = table(&[("km", "kilometre")]);
        let out = rewrite_cell("5 \u{212A}M, 6 km", &mut t, true);

        assert_eq!(out.text, "5 kilometre, 6 kilometre");
        assert_eq!(out.replacements, 2);
    }

    #[test]
    fn test_case_insensitive_match_narrower_than_pattern() {
        let mut t = table(&[("\u{212A}elvin", "K")]);
        let out = rewrite_cell("0 kelvin or 0 KELVIN!", &mut t, true);

        assert_eq!(out.text, "0 K or 0 K!");
        assert_eq!(out.replacements, 2);
        assert_eq!(t.get("\u{212A}elvin").unwrap().match_count, 2);
    }

    #[test]
    fn test_pattern_longer_than_cell_is_skipped() {
        let mut t = table(&[("longer pattern", "x")]);
        let out = rewrite_cell("short", &mut t, false);
        assert_eq!(out.text, "short");
        assert_eq!(out.replacements, 0);
    }

    #[test]
    fn test_empty_table_leaves_cell() {
        let mut t = PatternTable::default();
        let out = rewrite_cell("untouched", &mut t, true);
        assert_eq!(out.text, "untouched");
        assert_eq!(out.replacements, 0);
    }

    #[test]
    fn test_transform_row_preserves_shape() {
        let mut t = table(&[("x", "y")]);
        let row = vec!["x1", "", "abc", "xx"];
        let out = transform_row(&row, &mut t, false);

        assert_eq!(out.cells, vec!["y1", "", "abc", "yy"]);
        assert_eq!(out.cells_changed, 2);
        assert_eq!(out.replacements, 3);
        assert!(out.changed());
    }

    #[test]
    fn test_transform_empty_row() {
        let mut t = table(&[("x", "y")]);
        let row: Vec<String> = Vec::new();
        let out = transform_row(&row, &mut t, false);

        assert!(out.cells.is_empty());
        assert!(!out.changed());
        assert_eq!(out.replacements, 0);
    }

    #[test]
    fn test_cells_do_not_affect_each_other() {
        let mut t = table(&[("a", "b")]);
        let out = transform_row(&["a", "c"], &mut t, false);
        assert_eq!(out.cells, vec!["b", "c"]);
        assert_eq!(out.cells_changed, 1);
    }

    #[test]
    fn test_idempotent_under_disjoint_patterns() {
        let mut t = table(&[("red", "blue"), ("one", "two"), ("cat", "dog")]);
        let row = vec!["one red cat", "catalogue", "nothing", "redone"];

        let first = transform_row(&row, &mut t, false);
        let second = transform_row(&first.cells, &mut t, false);

        assert_eq!(second.cells, first.cells);
        assert_eq!(second.replacements, 0);
    }

    #[test]
    fn test_counter_conservation_over_rows() {
        let mut t = table(&[("ab", "x"), ("b", "yy"), ("y", "z")]);
        let rows = vec![vec!["abab", "b"], vec!["bbb"], vec![], vec!["zzz", "aby"]];

        let total: u64 = rows
            .iter()
            .map(|r| transform_row(r, &mut t, false).replacements)
            .sum();

        assert_eq!(t.total_matches(), total);
        assert!(total > 0);
    }
}
