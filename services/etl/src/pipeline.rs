//! Pipeline orchestration
//!
//! extract -> normalize -> (reshape) -> clean -> validate -> export -> upload -> persist
//!
//! Only a missing or unreadable source stops a run early; every later
//! failure is contained to the record or artifact it concerns.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::clean::{RowCleaner, SentinelSet};
use crate::config::PipelineConfig;
use crate::export::export_csv;
use crate::extract::read_table;
use crate::persist::{persist, PersistReport};
use crate::reshape::melt;
use crate::schema::{self, is_period_column, ColumnSelection, Layout};
use crate::store::RecordStore;
use crate::table::{CleanedDataset, Column, RecordShape, Table};
use crate::upload::{upload_best_effort, ObjectStore, UploadReceipt};
use crate::validate::{validate, DataSummary};

/// Result of the transform stage
#[derive(Debug)]
pub struct Transformed {
    pub dataset: CleanedDataset,
    pub dropped: usize,
}

/// Uppercased columns, folded the same way as the headers they match
fn uppercase_columns(config: &PipelineConfig) -> Vec<String> {
    config
        .uppercase_fields
        .iter()
        .map(|f| schema::fold_column_name(f))
        .collect()
}

fn transform_flat(table: Table, config: &PipelineConfig, sentinels: &SentinelSet) -> CleanedDataset {
    let recognized = config.recognized_columns();
    let table = schema::normalize(table, ColumnSelection::Recognized(&recognized));

    let columns: Vec<Column> = table
        .headers
        .iter()
        .filter_map(|name| {
            config
                .fields
                .iter()
                .find(|f| schema::fold_column_name(&f.column) == *name)
                .map(|f| Column::new(name.clone(), f.attribute.clone()))
        })
        .collect();

    let uppercase = uppercase_columns(config);
    let records = RowCleaner::new(sentinels)
        .with_uppercase(&table.headers, &uppercase)
        .clean_table(&table);

    CleanedDataset {
        shape: RecordShape::Flat,
        columns,
        records,
    }
}

fn transform_time_series(
    table: Table,
    config: &PipelineConfig,
    sentinels: &SentinelSet,
) -> CleanedDataset {
    let ts = &config.time_series;
    let table = schema::normalize(
        table,
        ColumnSelection::TimeSeries {
            entity_columns: &ts.entity_columns,
        },
    );

    let entity_col = table
        .headers
        .first()
        .filter(|h| !is_period_column(h))
        .map(|_| 0);
    if entity_col.is_none() {
        warn!(
            "No entity column found (expected one of {:?}); every reshaped row will be dropped",
            ts.entity_columns
        );
    }

    let rows = melt(&table, entity_col, sentinels);
    let records = RowCleaner::new(sentinels).clean_reshaped(rows);

    CleanedDataset {
        shape: RecordShape::TimeSeries,
        columns: vec![
            Column::new(ts.entity_attribute.clone(), ts.entity_attribute.clone()),
            Column::new(ts.period_attribute.clone(), ts.period_attribute.clone()),
            Column::new(ts.measure_attribute.clone(), ts.measure_attribute.clone()),
        ],
        records,
    }
}

/// Normalize, reshape when the layout calls for it, clean, and validate
pub fn transform(table: Table, config: &PipelineConfig) -> Transformed {
    let sentinels = SentinelSet::new(config.sentinels.iter().cloned());

    let layout = Layout::detect(&table.headers);
    info!("Detected {:?} layout", layout);

    let mut dataset = match layout {
        Layout::Flat => transform_flat(table, config, &sentinels),
        Layout::Wide => transform_time_series(table, config, &sentinels),
    };

    let validated = validate(
        std::mem::take(&mut dataset.records),
        dataset.shape.content_rule(),
    );
    dataset.records = validated.kept;

    info!(
        "Data transformed successfully. {} records processed, {} dropped",
        dataset.len(),
        validated.dropped
    );
    Transformed {
        dataset,
        dropped: validated.dropped,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub source: PathBuf,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub source_available: bool,
    pub input_rows: usize,
    pub shape: Option<RecordShape>,
    pub records_kept: usize,
    pub records_dropped: usize,
    pub summary: Option<DataSummary>,
    pub exported: Option<PathBuf>,
    pub upload: Option<UploadReceipt>,
    pub persist: PersistReport,
}

impl RunReport {
    fn new(source: &Path) -> Self {
        let now = Utc::now();
        Self {
            source: source.to_path_buf(),
            started_at: now,
            finished_at: now,
            source_available: false,
            input_rows: 0,
            shape: None,
            records_kept: 0,
            records_dropped: 0,
            summary: None,
            exported: None,
            upload: None,
            persist: PersistReport::default(),
        }
    }
}

pub struct Pipeline<'a> {
    config: &'a PipelineConfig,
    records: &'a dyn RecordStore,
    /// `None` disables the upload step
    objects: Option<&'a dyn ObjectStore>,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        config: &'a PipelineConfig,
        records: &'a dyn RecordStore,
        objects: Option<&'a dyn ObjectStore>,
    ) -> Self {
        Self {
            config,
            records,
            objects,
        }
    }

    pub async fn run(&self, input: &Path) -> RunReport {
        let mut report = RunReport::new(input);

        let table = match read_table(input).await {
            Ok(table) => table,
            Err(e) => {
                error!("Error extracting data: {}", e);
                report.finished_at = Utc::now();
                return report;
            }
        };
        report.source_available = true;
        report.input_rows = table.len();

        let Transformed { dataset, dropped } = transform(table, self.config);
        report.shape = Some(dataset.shape);
        report.records_kept = dataset.len();
        report.records_dropped = dropped;
        report.summary = Some(DataSummary::compute(&dataset, &uppercase_columns(self.config)));

        if dataset.is_empty() {
            info!("Nothing to load");
            report.persist = PersistReport::filtered(dropped);
            report.finished_at = Utc::now();
            return report;
        }

        match export_csv(&dataset, &self.config.export_path) {
            Ok(true) => report.exported = Some(self.config.export_path.clone()),
            Ok(false) => {}
            Err(e) => error!("Export failed: {:#}", e),
        }

        if let (Some(objects), Some(exported)) = (self.objects, &report.exported) {
            report.upload = upload_best_effort(
                objects,
                exported,
                &self.config.bucket,
                &self.config.object_key,
            )
            .await;
        }

        report.persist = persist(self.records, &self.config.table, &dataset, dropped).await;
        report.finished_at = Utc::now();
        report
    }
}
