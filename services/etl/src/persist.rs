//! Persistence gate
//!
//! Per record: build the storage item, check write eligibility, upsert.
//! Each record ends in exactly one terminal outcome and the report is a
//! fold over those outcomes, so one record's failure never changes what
//! happens to the next one. Nothing is retried.

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::store::{RecordStore, StorageItem, StoreError};
use crate::table::{CanonicalRecord, CleanedDataset, Column, ContentRule};

/// Terminal state of one record
#[derive(Debug)]
pub enum Outcome {
    Persisted,
    Ineligible,
    WriteFailed(StoreError),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PersistReport {
    /// Upserts submitted to the store
    pub attempted: usize,
    pub succeeded: usize,
    /// Filtered before write
    pub ineligible: usize,
    pub write_failed: usize,
}

impl PersistReport {
    /// Start from rows already dropped upstream, which count as skipped
    pub fn filtered(count: usize) -> Self {
        Self {
            ineligible: count,
            ..Self::default()
        }
    }

    pub fn skipped(&self) -> usize {
        self.ineligible + self.write_failed
    }

    /// Count one outcome
    pub fn tally(mut self, outcome: &Outcome) -> Self {
        match outcome {
            Outcome::Persisted => {
                self.attempted += 1;
                self.succeeded += 1;
            }
            Outcome::WriteFailed(_) => {
                self.attempted += 1;
                self.write_failed += 1;
            }
            Outcome::Ineligible => self.ineligible += 1,
        }
        self
    }
}

/// Every column becomes a string attribute; absent becomes ""
pub fn build_item(record: &CanonicalRecord, columns: &[Column]) -> StorageItem {
    let attributes = columns
        .iter()
        .enumerate()
        .map(|(idx, col)| {
            let value = record.value(idx).map(str::trim).unwrap_or_default();
            (col.attribute.clone(), value.to_string())
        })
        .collect::<BTreeMap<_, _>>();

    StorageItem {
        record_id: record.record_id().to_string(),
        attributes,
    }
}

/// Eligibility looks at content attributes only, never at `RecordID`
pub fn is_eligible(item: &StorageItem, rule: ContentRule) -> bool {
    rule.accepts(item.attributes.values().map(|v| !v.is_empty()))
}

async fn persist_one(
    store: &dyn RecordStore,
    table: &str,
    item: &StorageItem,
    rule: ContentRule,
) -> Outcome {
    if !is_eligible(item, rule) {
        info!("Skipping record {}: no eligible content", item.record_id);
        return Outcome::Ineligible;
    }

    match store.put_item(table, item).await {
        Ok(()) => Outcome::Persisted,
        Err(e) => {
            warn!("Error inserting record {}: {}", item.record_id, e);
            Outcome::WriteFailed(e)
        }
    }
}

/// Write every record of the dataset, one at a time, in order.
/// `filtered` is the number of rows dropped before reaching the gate.
pub async fn persist(
    store: &dyn RecordStore,
    table: &str,
    dataset: &CleanedDataset,
    filtered: usize,
) -> PersistReport {
    let rule = dataset.shape.content_rule();
    let mut report = PersistReport::filtered(filtered);

    for record in &dataset.records {
        let item = build_item(record, &dataset.columns);
        let outcome = persist_one(store, table, &item, rule).await;
        report = report.tally(&outcome);
    }

    info!(
        "Persisted into {}: {} successful inserts, {} skipped rows",
        table,
        report.succeeded,
        report.skipped()
    );
    report
}
