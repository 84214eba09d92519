//! ETL Service - Loads migration records into the record store
//!
//! Responsibilities:
//! - Read a CSV/XLS source file
//! - Normalize columns, pivot wide year columns, clean and validate rows
//! - Export the cleaned rows as CSV and upload the file to the object store
//! - Upsert each record into the key-value store, counting successes and skips
//!
//! Usage:
//!   cargo run --bin etl -- --input "random dataset - Sheet1 (1).csv"
//!
//!   # Without touching the database or object store:
//!   cargo run --bin etl -- --input data.csv --dry-run

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use etl::config::{Config, ObjectStoreKind, PipelineConfig};
use etl::pipeline::{Pipeline, RunReport};
use etl::store::{MemoryRecordStore, PgRecordStore, RecordStore};
use etl::upload::{FsObjectStore, HttpObjectStore, ObjectStore};

#[derive(Parser, Debug)]
#[command(name = "etl", about = "Cleans migration records and loads them into the record store")]
struct Args {
    /// Source file (CSV, XLS, XLSX, ODS)
    #[arg(long)]
    input: PathBuf,

    /// Pipeline config (JSON); defaults are used when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Dry run - in-memory record store, no upload
    #[arg(long, default_value = "false")]
    dry_run: bool,

    /// Skip the object store upload
    #[arg(long, default_value = "false")]
    skip_upload: bool,

    /// Write the run report as JSON to this path
    #[arg(long)]
    report: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long, default_value = "false")]
    verbose: bool,
}

fn setup_logging(verbose: bool) {
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();
}

fn build_object_store(config: &Config) -> Result<Box<dyn ObjectStore>> {
    let store: Box<dyn ObjectStore> = match config.object_store {
        ObjectStoreKind::Fs => Box::new(FsObjectStore::new(&config.object_fs_dir)),
        ObjectStoreKind::Http => {
            let endpoint = config
                .object_endpoint
                .as_deref()
                .context("OBJECT_ENDPOINT env var missing for OBJECT_STORE=http")?;
            let client = reqwest::Client::builder()
                .timeout(Duration::from_secs(120))
                .build()?;
            Box::new(HttpObjectStore::new(client, endpoint, config.object_token.clone()))
        }
    };
    Ok(store)
}

fn build_record_store(config: &Config, dry_run: bool) -> Result<Box<dyn RecordStore>> {
    if dry_run {
        return Ok(Box::new(MemoryRecordStore::new()));
    }
    let db_url = config.db_url.as_deref().context("DB_URL env var missing")?;
    Ok(Box::new(PgRecordStore::connect_lazy(db_url)?))
}

fn print_report(report: &RunReport) {
    println!("\n=== Data Summary ===");
    match &report.summary {
        Some(summary) => print!("{}", summary),
        None => println!("No data"),
    }

    println!("\n=== Load Summary ===");
    println!("Input rows: {}", report.input_rows);
    println!("Records kept: {}", report.records_kept);
    println!("Records dropped: {}", report.records_dropped);
    match &report.exported {
        Some(path) => println!("Exported: {}", path.display()),
        None => println!("Exported: -"),
    }
    match &report.upload {
        Some(receipt) => println!("Uploaded: {} ({})", receipt.location, receipt.content_hash),
        None => println!("Uploaded: -"),
    }
    println!("Attempted: {}", report.persist.attempted);
    println!("Succeeded: {}", report.persist.succeeded);
    println!(
        "Skipped: {} ({} filtered before write, {} failed writes)",
        report.persist.skipped(),
        report.persist.ineligible,
        report.persist.write_failed
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    setup_logging(args.verbose);
    let config = Config::from_env()?;
    let pipeline_config = PipelineConfig::load(args.config.as_deref()).await?;

    println!("=== Migration Records ETL ===");
    println!("Input: {}", args.input.display());
    println!("Table: {}", pipeline_config.table);
    println!("Mode: {}", if args.dry_run { "dry-run" } else { "live" });

    let records = build_record_store(&config, args.dry_run)?;
    let objects = if args.dry_run || args.skip_upload {
        info!("Upload disabled for this run");
        None
    } else {
        Some(build_object_store(&config)?)
    };

    let pipeline = Pipeline::new(&pipeline_config, &*records, objects.as_deref());
    let report = pipeline.run(&args.input).await;

    if !report.source_available {
        println!("\nSource unavailable - nothing to transform");
    } else {
        print_report(&report);
    }

    if let Some(path) = &args.report {
        let json = serde_json::to_string_pretty(&report)?;
        tokio::fs::write(path, json)
            .await
            .with_context(|| format!("Failed to write run report {}", path.display()))?;
        println!("\nReport written to {}", path.display());
    }

    Ok(())
}
