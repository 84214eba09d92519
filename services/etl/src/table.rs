//! Record model shared by every pipeline stage
//!
//! - `Table`: raw tabular data exactly as the reader produced it
//! - `CanonicalRecord`: a cleaned row carrying its generated `RecordID`
//! - `CleanedDataset`: cleaned rows plus the column layout they were built from

use serde::Serialize;
use std::fmt;
use uuid::Uuid;

/// A single cell as read from the source, before any validation
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RawValue {
    #[default]
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl RawValue {
    /// Coerce the cell to text. Values with no faithful text form
    /// (NaN, infinities) come back as `None`.
    pub fn to_text(&self) -> Option<String> {
        match self {
            RawValue::Empty => None,
            RawValue::Text(s) => Some(s.clone()),
            RawValue::Int(i) => Some(i.to_string()),
            RawValue::Float(f) if f.is_finite() => Some(f.to_string()),
            RawValue::Float(_) => None,
            RawValue::Bool(b) => Some(b.to_string()),
        }
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            RawValue::Empty
        } else {
            RawValue::Text(s.to_string())
        }
    }
}

/// Tabular dataset with named columns, one `Vec<RawValue>` per input row
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<RawValue>>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<RawValue>>) -> Self {
        Self { headers, rows }
    }

    /// Build a table from string cells (mostly for tests and CSV input)
    pub fn from_strings(headers: &[&str], rows: &[&[&str]]) -> Self {
        Self {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: rows
                .iter()
                .map(|row| row.iter().map(|cell| RawValue::from(*cell)).collect())
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell at (row, col); short rows read as empty
    pub fn cell(&self, row: usize, col: usize) -> &RawValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&RawValue::Empty)
    }
}

/// Globally unique record identifier. Only `generate` creates one, so an id
/// is never derived from content and never recomputed for the same record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which of the two record shapes a dataset carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordShape {
    /// One row per person, projected onto the recognized columns
    Flat,
    /// One row per (entity, period) after pivoting a wide layout
    TimeSeries,
}

impl RecordShape {
    /// The write/retention predicate that applies to this shape
    pub fn content_rule(self) -> ContentRule {
        match self {
            RecordShape::Flat => ContentRule::AnyContent,
            RecordShape::TimeSeries => ContentRule::AllRequired,
        }
    }
}

/// Predicate over a record's content fields (the id is never content)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentRule {
    /// At least one content field is present
    AnyContent,
    /// Every content field is present
    AllRequired,
}

impl ContentRule {
    pub fn accepts(self, mut present: impl Iterator<Item = bool>) -> bool {
        match self {
            ContentRule::AnyContent => present.any(|p| p),
            ContentRule::AllRequired => present.all(|p| p),
        }
    }
}

/// Column of a cleaned dataset: internal name plus storage attribute name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: String,
    pub attribute: String,
}

impl Column {
    pub fn new(name: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attribute: attribute.into(),
        }
    }
}

/// A cleaned row. `None` is the single absent representation.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRecord {
    record_id: RecordId,
    pub values: Vec<Option<String>>,
}

impl CanonicalRecord {
    /// Wrap cleaned values and assign a fresh identifier
    pub fn new(values: Vec<Option<String>>) -> Self {
        Self {
            record_id: RecordId::generate(),
            values,
        }
    }

    pub fn record_id(&self) -> &RecordId {
        &self.record_id
    }

    pub fn value(&self, idx: usize) -> Option<&str> {
        self.values.get(idx).and_then(|v| v.as_deref())
    }

    pub fn satisfies(&self, rule: ContentRule) -> bool {
        rule.accepts(self.values.iter().map(|v| v.is_some()))
    }
}

/// Output of the transform stage
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedDataset {
    pub shape: RecordShape,
    pub columns: Vec<Column>,
    pub records: Vec<CanonicalRecord>,
}

impl CleanedDataset {
    pub fn empty(shape: RecordShape) -> Self {
        Self {
            shape,
            columns: Vec::new(),
            records: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_raw_value_text_coercion() {
        assert_eq!(RawValue::Text("a".into()).to_text(), Some("a".to_string()));
        assert_eq!(RawValue::Int(42).to_text(), Some("42".to_string()));
        assert_eq!(RawValue::Float(120.0).to_text(), Some("120".to_string()));
        assert_eq!(RawValue::Float(0.25).to_text(), Some("0.25".to_string()));
        assert_eq!(RawValue::Bool(true).to_text(), Some("true".to_string()));
        assert_eq!(RawValue::Empty.to_text(), None);
    }

    #[test]
    fn test_raw_value_non_finite_is_absent() {
        assert_eq!(RawValue::Float(f64::NAN).to_text(), None);
        assert_eq!(RawValue::Float(f64::INFINITY).to_text(), None);
    }

    #[test]
    fn test_cell_short_row_reads_empty() {
        let table = Table::from_strings(&["a", "b"], &[&["x"]]);
        assert_eq!(table.cell(0, 1), &RawValue::Empty);
        assert_eq!(table.cell(5, 0), &RawValue::Empty);
    }

    #[test]
    fn test_record_ids_unique_for_identical_content() {
        let values = vec![Some("Anna".to_string())];
        let ids: HashSet<String> = (0..100)
            .map(|_| CanonicalRecord::new(values.clone()).record_id().to_string())
            .collect();
        assert_eq!(ids.len(), 100);
    }

    #[test]
    fn test_content_rules() {
        let partial = CanonicalRecord::new(vec![Some("x".into()), None]);
        let blank = CanonicalRecord::new(vec![None, None]);
        let full = CanonicalRecord::new(vec![Some("x".into()), Some("y".into())]);

        assert!(partial.satisfies(ContentRule::AnyContent));
        assert!(!partial.satisfies(ContentRule::AllRequired));
        assert!(!blank.satisfies(ContentRule::AnyContent));
        assert!(full.satisfies(ContentRule::AllRequired));
    }
}
