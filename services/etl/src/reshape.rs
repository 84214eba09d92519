//! Shape transformer: wide (one column per year) to long (one row per year)
//!
//! Purely structural. Measures stay text so the source's precision and
//! formatting survive untouched.

use tracing::debug;

use crate::clean::SentinelSet;
use crate::schema::period_token;
use crate::table::Table;

/// One (entity, period, measure) triple before cleaning
#[derive(Debug, Clone, PartialEq)]
pub struct ReshapedRow {
    pub entity: Option<String>,
    /// `None` when the source column name had no 4-digit token
    pub period: Option<String>,
    pub measure: String,
}

/// Pivot a normalized wide table. Every column other than `entity_col` is
/// treated as a period column. Rows are emitted entity-major, in input
/// column order.
pub fn melt(table: &Table, entity_col: Option<usize>, sentinels: &SentinelSet) -> Vec<ReshapedRow> {
    let period_cols: Vec<(usize, Option<String>)> = table
        .headers
        .iter()
        .enumerate()
        .filter(|(i, _)| Some(*i) != entity_col)
        .map(|(i, name)| (i, period_token(name)))
        .collect();

    let mut out = Vec::with_capacity(table.len() * period_cols.len());
    let mut placeholders = 0usize;

    for row in 0..table.len() {
        let entity = entity_col.and_then(|col| table.cell(row, col).to_text());

        for (col, period) in &period_cols {
            let measure = match table.cell(row, *col).to_text() {
                Some(text) if !sentinels.is_absent(text.trim()) => text.trim().to_string(),
                _ => {
                    placeholders += 1;
                    continue;
                }
            };

            out.push(ReshapedRow {
                entity: entity.clone(),
                period: period.clone(),
                measure,
            });
        }
    }

    debug!(
        "Melted {} rows x {} periods into {} rows ({} placeholder values skipped)",
        table.len(),
        period_cols.len(),
        out.len(),
        placeholders
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::RawValue;

    fn sentinels() -> SentinelSet {
        SentinelSet::new(["", "nan", "NaN", "null", ".."])
    }

    #[test]
    fn test_melt_skips_placeholder_measure() {
        let table = Table::from_strings(
            &["country dest name", "1990", "1991"],
            &[&["StateA", "120", ".."]],
        );
        let rows = melt(&table, Some(0), &sentinels());
        assert_eq!(
            rows,
            vec![ReshapedRow {
                entity: Some("StateA".to_string()),
                period: Some("1990".to_string()),
                measure: "120".to_string(),
            }]
        );
    }

    #[test]
    fn test_melt_row_count_and_order() {
        let table = Table::from_strings(
            &["state", "1990", "1991", "1992"],
            &[&["A", "1", "2", "3"], &["B", "4", " ", "nan"]],
        );
        let rows = melt(&table, Some(0), &sentinels());
        // 2 rows x 3 periods minus 2 placeholders
        assert_eq!(rows.len(), 4);
        let keys: Vec<(String, String)> = rows
            .iter()
            .map(|r| (r.entity.clone().unwrap(), r.period.clone().unwrap()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("A".to_string(), "1990".to_string()),
                ("A".to_string(), "1991".to_string()),
                ("A".to_string(), "1992".to_string()),
                ("B".to_string(), "1990".to_string()),
            ]
        );
    }

    #[test]
    fn test_melt_preserves_measure_text() {
        let table = Table::from_strings(&["state", "1990"], &[&["A", " 0120.50 "]]);
        let rows = melt(&table, Some(0), &sentinels());
        assert_eq!(rows[0].measure, "0120.50");
    }

    #[test]
    fn test_melt_numeric_cells() {
        let table = Table::new(
            vec!["state".to_string(), "2001".to_string()],
            vec![vec![RawValue::Text("A".into()), RawValue::Float(12.5)]],
        );
        let rows = melt(&table, Some(0), &sentinels());
        assert_eq!(rows[0].measure, "12.5");
    }

    #[test]
    fn test_melt_unextractable_period_is_none() {
        let table = Table::from_strings(&["state", "2000s"], &[&["A", "5"]]);
        let rows = melt(&table, Some(0), &sentinels());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].period, None);
    }

    #[test]
    fn test_melt_without_entity_column() {
        let table = Table::from_strings(&["1990"], &[&["7"]]);
        let rows = melt(&table, None, &sentinels());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].entity, None);
    }
}
