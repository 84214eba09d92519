//! Row validator and data summary
//!
//! Validation is a filter, never a repair: a record either satisfies the
//! retention rule for its shape or it is dropped.

use serde::Serialize;
use std::fmt;
use tracing::debug;

use crate::table::{CanonicalRecord, CleanedDataset, ContentRule};

/// Records kept, plus how many were dropped
#[derive(Debug)]
pub struct Validated {
    pub kept: Vec<CanonicalRecord>,
    pub dropped: usize,
}

/// Keep records that satisfy `rule`, preserving input order
pub fn validate(records: Vec<CanonicalRecord>, rule: ContentRule) -> Validated {
    let total = records.len();
    let kept: Vec<CanonicalRecord> = records
        .into_iter()
        .filter(|record| {
            let keep = record.satisfies(rule);
            if !keep {
                debug!("Dropping record {}: no usable content", record.record_id());
            }
            keep
        })
        .collect();
    let dropped = total - kept.len();
    Validated { kept, dropped }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub name: String,
    pub non_null: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistinctValues {
    pub name: String,
    pub values: Vec<String>,
}

/// Post-transform overview of what is about to be loaded
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataSummary {
    pub total_records: usize,
    pub columns: Vec<String>,
    pub non_null: Vec<ColumnSummary>,
    /// Distinct values of the categorical fields, first-seen order
    pub distinct: Vec<DistinctValues>,
}

impl DataSummary {
    pub fn compute(dataset: &CleanedDataset, categorical: &[String]) -> Self {
        let mut columns: Vec<String> = dataset.columns.iter().map(|c| c.name.clone()).collect();
        columns.push("RecordID".to_string());

        let non_null = dataset
            .columns
            .iter()
            .enumerate()
            .map(|(idx, col)| ColumnSummary {
                name: col.name.clone(),
                non_null: dataset
                    .records
                    .iter()
                    .filter(|r| r.value(idx).is_some())
                    .count(),
            })
            .collect();

        let distinct = categorical
            .iter()
            .filter_map(|name| {
                let idx = dataset.column_index(name)?;
                let mut values: Vec<String> = Vec::new();
                for value in dataset.records.iter().filter_map(|r| r.value(idx)) {
                    if !values.iter().any(|v| v == value) {
                        values.push(value.to_string());
                    }
                }
                Some(DistinctValues {
                    name: name.clone(),
                    values,
                })
            })
            .collect();

        Self {
            total_records: dataset.len(),
            columns,
            non_null,
            distinct,
        }
    }
}

impl fmt::Display for DataSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total records: {}", self.total_records)?;
        writeln!(f, "Columns: {:?}", self.columns)?;
        for col in &self.non_null {
            writeln!(f, "{}: {} non-null values", col.name, col.non_null)?;
        }
        for d in &self.distinct {
            writeln!(f, "Unique {}: {:?}", d.name, d.values)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{Column, RecordShape};

    fn record(values: &[Option<&str>]) -> CanonicalRecord {
        CanonicalRecord::new(values.iter().map(|v| v.map(|s| s.to_string())).collect())
    }

    // -------------------------------------------------------------------------
    // VALIDATION TESTS
    // -------------------------------------------------------------------------

    #[test]
    fn test_validate_drops_all_absent() {
        let records = vec![
            record(&[Some("Anna"), None, Some("O+")]),
            record(&[None, None, None]),
            record(&[None, Some("Lee"), None]),
        ];
        let out = validate(records, ContentRule::AnyContent);
        assert_eq!(out.kept.len(), 2);
        assert_eq!(out.dropped, 1);
        assert_eq!(out.kept[0].value(0), Some("Anna"));
        assert_eq!(out.kept[1].value(1), Some("Lee"));
    }

    #[test]
    fn test_validate_time_series_requires_all() {
        let records = vec![
            record(&[Some("StateA"), Some("1990"), Some("120")]),
            record(&[Some("StateA"), None, Some("5")]),
            record(&[None, Some("1990"), Some("5")]),
        ];
        let out = validate(records, ContentRule::AllRequired);
        assert_eq!(out.kept.len(), 1);
        assert_eq!(out.dropped, 2);
    }

    #[test]
    fn test_validate_keeps_ids() {
        let original = record(&[Some("x")]);
        let id = original.record_id().clone();
        let out = validate(vec![original], ContentRule::AnyContent);
        assert_eq!(out.kept[0].record_id(), &id);
    }

    // -------------------------------------------------------------------------
    // SUMMARY TESTS
    // -------------------------------------------------------------------------

    #[test]
    fn test_summary_counts() {
        let dataset = CleanedDataset {
            shape: RecordShape::Flat,
            columns: vec![
                Column::new("firstname", "FirstName"),
                Column::new("bloodgroup", "BloodGroup"),
            ],
            records: vec![
                record(&[Some("Anna"), Some("O+")]),
                record(&[None, Some("A-")]),
                record(&[Some("Bob"), Some("O+")]),
            ],
        };
        let summary = DataSummary::compute(&dataset, &["bloodgroup".to_string()]);

        assert_eq!(summary.total_records, 3);
        assert_eq!(summary.columns, vec!["firstname", "bloodgroup", "RecordID"]);
        assert_eq!(summary.non_null[0].non_null, 2);
        assert_eq!(summary.non_null[1].non_null, 3);
        assert_eq!(summary.distinct[0].values, vec!["O+", "A-"]);

        let text = summary.to_string();
        assert!(text.contains("firstname: 2 non-null values"));
    }

    #[test]
    fn test_summary_skips_missing_categorical() {
        let dataset = CleanedDataset::empty(RecordShape::TimeSeries);
        let summary = DataSummary::compute(&dataset, &["bloodgroup".to_string()]);
        assert!(summary.distinct.is_empty());
        assert_eq!(summary.total_records, 0);
    }
}
