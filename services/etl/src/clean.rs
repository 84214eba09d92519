//! Row cleaner
//!
//! Trims text, collapses sentinel tokens to `None`, uppercases the
//! categorical fields, and gives every row a fresh `RecordID`.
//! Cleaning is total: nothing here can fail for any input row.

use std::collections::HashSet;

use crate::reshape::ReshapedRow;
use crate::table::{CanonicalRecord, RawValue, Table};

/// Tokens that stand for "no data". The empty string is always one.
#[derive(Debug, Clone)]
pub struct SentinelSet {
    tokens: HashSet<String>,
}

impl SentinelSet {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut tokens: HashSet<String> = tokens.into_iter().map(Into::into).collect();
        tokens.insert(String::new());
        Self { tokens }
    }

    pub fn is_absent(&self, trimmed: &str) -> bool {
        self.tokens.contains(trimmed)
    }

    /// The single place a text value becomes present-or-absent
    pub fn normalize(&self, value: Option<&str>) -> Option<String> {
        let trimmed = value?.trim();
        if self.is_absent(trimmed) {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    pub fn normalize_raw(&self, value: &RawValue) -> Option<String> {
        self.normalize(value.to_text().as_deref())
    }
}

pub struct RowCleaner<'a> {
    sentinels: &'a SentinelSet,
    /// Column positions to uppercase
    uppercase: Vec<usize>,
}

impl<'a> RowCleaner<'a> {
    pub fn new(sentinels: &'a SentinelSet) -> Self {
        Self {
            sentinels,
            uppercase: Vec::new(),
        }
    }

    /// Uppercase the named columns of `headers` (folded names)
    pub fn with_uppercase(mut self, headers: &[String], fields: &[String]) -> Self {
        self.uppercase = headers
            .iter()
            .enumerate()
            .filter(|(_, h)| fields.iter().any(|f| f == *h))
            .map(|(i, _)| i)
            .collect();
        self
    }

    /// Clean every row of a normalized flat table
    pub fn clean_table(&self, table: &Table) -> Vec<CanonicalRecord> {
        (0..table.len())
            .map(|row| {
                let values = (0..table.headers.len())
                    .map(|col| {
                        let value = self.sentinels.normalize_raw(table.cell(row, col));
                        if self.uppercase.contains(&col) {
                            value.map(|v| v.to_uppercase())
                        } else {
                            value
                        }
                    })
                    .collect();
                CanonicalRecord::new(values)
            })
            .collect()
    }

    /// Clean reshaped rows into (entity, period, measure) records
    pub fn clean_reshaped(&self, rows: Vec<ReshapedRow>) -> Vec<CanonicalRecord> {
        rows.into_iter()
            .map(|row| {
                CanonicalRecord::new(vec![
                    self.sentinels.normalize(row.entity.as_deref()),
                    self.sentinels.normalize(row.period.as_deref()),
                    self.sentinels.normalize(Some(&row.measure)),
                ])
            })
            .collect()
    }
}
