//! Flat CSV export of the cleaned dataset

use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

use crate::table::CleanedDataset;

/// Write the dataset as CSV: internal column names, then `RecordID`.
/// Nothing is written for an empty dataset; returns whether a file was written.
pub fn export_csv(dataset: &CleanedDataset, path: &Path) -> Result<bool> {
    if dataset.is_empty() {
        info!("No records survived cleaning - skipping export");
        return Ok(false);
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create export directory {}", parent.display()))?;
    }

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create export file {}", path.display()))?;

    let mut header: Vec<&str> = dataset.columns.iter().map(|c| c.name.as_str()).collect();
    header.push("RecordID");
    writer.write_record(&header)?;

    for record in &dataset.records {
        let mut row: Vec<&str> = (0..dataset.columns.len())
            .map(|idx| record.value(idx).unwrap_or(""))
            .collect();
        row.push(record.record_id().as_str());
        writer.write_record(&row)?;
    }

    writer.flush().context("Failed to flush export file")?;
    info!("Cleaned data saved to {}", path.display());
    Ok(true)
}
