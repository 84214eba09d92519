//! Migration records ETL
//!
//! Loads tabular migration-record files, cleans them into canonical records
//! with a generated `RecordID`, exports a flat CSV, uploads it to an object
//! store, and upserts every record into a key-value store.

pub mod clean;
pub mod config;
pub mod export;
pub mod extract;
pub mod persist;
pub mod pipeline;
pub mod reshape;
pub mod schema;
pub mod store;
pub mod table;
pub mod upload;
pub mod validate;
