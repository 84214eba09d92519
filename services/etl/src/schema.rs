//! Schema normalizer and layout detection
//!
//! Column names are folded (trimmed, lowercased) and the table is projected
//! onto the columns the pipeline recognizes. Unrecognized columns are dropped
//! silently. Folding twice is the same as folding once, so normalizing an
//! already-normalized table is a no-op.

use regex::Regex;
use std::sync::LazyLock;

use crate::table::Table;

/// Period columns start with a 19xx/20xx year
static PERIOD_COLUMN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:19|20)\d{2}").expect("valid period column regex"));

/// First stand-alone 4-digit run in a column name
static PERIOD_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4})\b").expect("valid period token regex"));

pub fn fold_column_name(name: &str) -> String {
    name.trim().to_lowercase()
}

pub fn is_period_column(folded: &str) -> bool {
    PERIOD_COLUMN_RE.is_match(folded)
}

/// Extract the 4-digit period key from a column name
pub fn period_token(column: &str) -> Option<String> {
    PERIOD_TOKEN_RE
        .captures(column)
        .map(|caps| caps[1].to_string())
}

/// The two layouts the pipeline knows how to load. Resolved once, up front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Layout {
    /// One row per record, one column per field
    Flat,
    /// One column per period; needs pivoting to long form
    Wide,
}

impl Layout {
    /// Does the dataset declare period-indexed columns?
    pub fn detect(headers: &[String]) -> Self {
        if headers
            .iter()
            .any(|h| is_period_column(&fold_column_name(h)))
        {
            Layout::Wide
        } else {
            Layout::Flat
        }
    }
}

/// Which columns survive normalization
#[derive(Debug, Clone, Copy)]
pub enum ColumnSelection<'a> {
    /// Exactly these folded names, in this order; missing ones are skipped
    Recognized(&'a [String]),
    /// The first matching entity column, then every period column in input order
    TimeSeries { entity_columns: &'a [String] },
}

fn project(table: Table, keep: &[usize]) -> Table {
    let headers = keep
        .iter()
        .map(|&i| fold_column_name(&table.headers[i]))
        .collect();
    let rows = table
        .rows
        .into_iter()
        .map(|row| {
            keep.iter()
                .map(|&i| row.get(i).cloned().unwrap_or_default())
                .collect()
        })
        .collect();
    Table::new(headers, rows)
}

/// Fold column names and keep only the selected columns
pub fn normalize(table: Table, selection: ColumnSelection<'_>) -> Table {
    let folded: Vec<String> = table.headers.iter().map(|h| fold_column_name(h)).collect();

    let keep: Vec<usize> = match selection {
        ColumnSelection::Recognized(recognized) => recognized
            .iter()
            .filter_map(|name| {
                let name = fold_column_name(name);
                folded.iter().position(|h| *h == name)
            })
            .collect(),
        ColumnSelection::TimeSeries { entity_columns } => {
            let entity = entity_columns.iter().find_map(|name| {
                let name = fold_column_name(name);
                folded.iter().position(|h| *h == name)
            });
            entity
                .into_iter()
                .chain(
                    folded
                        .iter()
                        .enumerate()
                        .filter(|(_, h)| is_period_column(h))
                        .map(|(i, _)| i),
                )
                .collect()
        }
    };

    project(table, &keep)
}
