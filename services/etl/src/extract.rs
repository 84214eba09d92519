//! Source reader: turns a CSV or spreadsheet file into a raw `Table`
//!
//! Any failure here means there is nothing to transform; callers treat
//! `SourceError` as "no input" rather than aborting with a panic.

use calamine::{open_workbook_auto, Data, Reader};
use encoding_rs::WINDOWS_1252;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info};

use crate::table::{RawValue, Table};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("source file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read {path}: {reason}")]
    Unreadable { path: PathBuf, reason: String },

    #[error("malformed source {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },
}

/// Detect spreadsheet input by extension (calamine handles the rest)
fn is_excel_file(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref(),
        Some("xls" | "xlsx" | "xlsm" | "xlsb" | "ods")
    )
}

pub async fn read_table(path: &Path) -> Result<Table, SourceError> {
    if !fs::try_exists(path).await.unwrap_or(false) {
        return Err(SourceError::NotFound(path.to_path_buf()));
    }

    let table = if is_excel_file(path) {
        info!("Reading spreadsheet: {}", path.display());
        read_workbook(path)?
    } else {
        info!("Reading CSV: {}", path.display());
        let bytes = fs::read(path).await.map_err(|e| SourceError::Unreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        parse_csv(&bytes).map_err(|e| SourceError::Malformed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?
    };

    info!(
        "Extracted {} rows x {} columns",
        table.len(),
        table.headers.len()
    );
    Ok(table)
}

/// Decode as UTF-8, falling back to Windows-1252 for legacy exports
fn decode(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(s) => Cow::Borrowed(s),
        Err(_) => {
            debug!("Input is not UTF-8, decoding as Windows-1252");
            let (text, _, _) = WINDOWS_1252.decode(bytes);
            text
        }
    }
}

/// Parse CSV bytes. Values are kept as text and untrimmed; cleaning
/// happens later so numeric columns keep their exact source form.
pub fn parse_csv(bytes: &[u8]) -> Result<Table, csv::Error> {
    let decoded = decode(bytes);
    let text: &str = &decoded;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
    let width = headers.len();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        let mut row: Vec<RawValue> = record.iter().take(width).map(RawValue::from).collect();
        row.resize(width, RawValue::Empty);
        rows.push(row);
    }

    Ok(Table::new(headers, rows))
}

fn cell_to_raw(cell: &Data) -> RawValue {
    match cell {
        Data::Empty | Data::Error(_) => RawValue::Empty,
        Data::String(s) => RawValue::from(s.as_str()),
        Data::Int(i) => RawValue::Int(*i),
        Data::Float(f) => RawValue::Float(*f),
        Data::Bool(b) => RawValue::Bool(*b),
        other => RawValue::Text(other.to_string()),
    }
}

/// Read the first sheet of a workbook; the first row is the header
fn read_workbook(path: &Path) -> Result<Table, SourceError> {
    let malformed = |reason: String| SourceError::Malformed {
        path: path.to_path_buf(),
        reason,
    };

    let mut workbook = open_workbook_auto(path).map_err(|e| malformed(e.to_string()))?;
    let sheet_names = workbook.sheet_names().to_vec();
    let Some(sheet_name) = sheet_names.first() else {
        return Err(malformed("workbook has no sheets".to_string()));
    };
    debug!("Reading sheet '{}' (first of {})", sheet_name, sheet_names.len());

    let range = workbook
        .worksheet_range(sheet_name)
        .map_err(|e| malformed(e.to_string()))?;

    let mut rows_iter = range.rows();
    let headers: Vec<String> = match rows_iter.next() {
        Some(header_row) => header_row
            .iter()
            .map(|cell| match cell {
                Data::String(s) => s.clone(),
                Data::Empty => String::new(),
                other => other.to_string(),
            })
            .collect(),
        None => return Ok(Table::default()),
    };

    let rows = rows_iter
        .map(|row| {
            let mut cells: Vec<RawValue> = row.iter().map(cell_to_raw).collect();
            cells.resize(headers.len(), RawValue::Empty);
            cells
        })
        .collect();

    Ok(Table::new(headers, rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_csv_basic() {
        let csv = "FirstName,LastName,BloodGroup\n Anna ,,o+\nBob,Smith,A-\n";
        let table = parse_csv(csv.as_bytes()).unwrap();
        assert_eq!(table.headers, vec!["FirstName", "LastName", "BloodGroup"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(0, 0), &RawValue::Text(" Anna ".to_string()));
        assert_eq!(table.cell(0, 1), &RawValue::Empty);
    }

    #[test]
    fn test_parse_csv_strips_bom() {
        let csv = "\u{feff}FirstName\nAnna\n";
        let table = parse_csv(csv.as_bytes()).unwrap();
        assert_eq!(table.headers, vec!["FirstName"]);
    }

    #[test]
    fn test_parse_csv_ragged_rows() {
        let csv = "a,b,c\n1\n1,2,3,4\n";
        let table = parse_csv(csv.as_bytes()).unwrap();
        assert_eq!(table.rows[0].len(), 3);
        assert_eq!(table.rows[1].len(), 3);
        assert_eq!(table.cell(1, 2), &RawValue::Text("3".to_string()));
    }

    #[test]
    fn test_parse_csv_keeps_numeric_text() {
        let csv = "State,1990\nA,0120.50\n";
        let table = parse_csv(csv.as_bytes()).unwrap();
        assert_eq!(table.cell(0, 1), &RawValue::Text("0120.50".to_string()));
    }

    #[test]
    fn test_parse_csv_windows_1252_fallback() {
        // "José" with 0xE9 for é
        let bytes = b"FirstName\nJos\xe9\n";
        let table = parse_csv(bytes).unwrap();
        assert_eq!(table.cell(0, 0), &RawValue::Text("José".to_string()));
    }

    #[test]
    fn test_is_excel_file() {
        assert!(is_excel_file(Path::new("data.xlsx")));
        assert!(is_excel_file(Path::new("DATA.XLS")));
        assert!(!is_excel_file(Path::new("data.csv")));
        assert!(!is_excel_file(Path::new("data")));
    }

    #[tokio::test]
    async fn test_read_table_missing_file() {
        let err = read_table(Path::new("/nonexistent/dir/input.csv"))
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_read_table_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.csv");
        std::fs::write(&path, "FirstName,LastName\nAnna,Lee\n").unwrap();

        let table = read_table(&path).await.unwrap();
        assert_eq!(table.len(), 1);
    }

    #[tokio::test]
    async fn test_read_table_workbook_first_sheet() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/wide_migration.xlsx");

        let table = read_table(&path).await.unwrap();

        assert_eq!(table.headers, vec!["Country Name", "1990", "1991"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(0, 0), &RawValue::Text("StateA".to_string()));
        assert_eq!(table.cell(0, 1).to_text(), Some("120".to_string()));
        assert_eq!(table.cell(0, 2), &RawValue::Text("..".to_string()));
        assert_eq!(table.cell(1, 2).to_text(), Some("7.5".to_string()));
    }

    #[tokio::test]
    async fn test_read_table_corrupt_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.xlsx");
        std::fs::write(&path, b"not a zip archive").unwrap();

        let err = read_table(&path).await.unwrap_err();
        assert!(matches!(err, SourceError::Malformed { .. }));
    }
}
