//! Runtime configuration
//!
//! Two layers, as in the other services:
//! - `Config`: deployment settings from the environment (`.env` honored)
//! - `PipelineConfig`: what to extract and where to put it, from an optional JSON file

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::fs;

// =============================================================================
// Environment
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectStoreKind {
    Fs,
    Http,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub db_url: Option<String>,
    pub object_store: ObjectStoreKind,
    pub object_fs_dir: PathBuf,
    pub object_endpoint: Option<String>,
    pub object_token: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let object_store = match std::env::var("OBJECT_STORE")
            .unwrap_or_else(|_| "fs".to_string())
            .as_str()
        {
            "fs" => ObjectStoreKind::Fs,
            "http" => ObjectStoreKind::Http,
            other => anyhow::bail!("OBJECT_STORE must be 'fs' or 'http', got '{}'", other),
        };

        Ok(Self {
            db_url: std::env::var("DB_URL").ok(),
            object_store,
            object_fs_dir: PathBuf::from(
                std::env::var("OBJECT_FS_DIR").unwrap_or_else(|_| "./data/objects".to_string()),
            ),
            object_endpoint: std::env::var("OBJECT_ENDPOINT").ok(),
            object_token: std::env::var("OBJECT_TOKEN").ok().filter(|t| !t.is_empty()),
        })
    }
}

// =============================================================================
// Pipeline configuration
// =============================================================================

/// A recognized input column and the attribute it is stored under
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct FieldSpec {
    pub column: String,
    pub attribute: String,
}

impl FieldSpec {
    fn new(column: &str, attribute: &str) -> Self {
        Self {
            column: column.to_string(),
            attribute: attribute.to_string(),
        }
    }
}

/// Settings for the wide (one column per year) layout
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimeSeriesConfig {
    /// Folded column names accepted as the entity column, in preference order
    pub entity_columns: Vec<String>,
    pub entity_attribute: String,
    pub period_attribute: String,
    pub measure_attribute: String,
}

impl Default for TimeSeriesConfig {
    fn default() -> Self {
        Self {
            entity_columns: vec![
                "country dest name".to_string(),
                "country name".to_string(),
                "state".to_string(),
            ],
            entity_attribute: "State".to_string(),
            period_attribute: "Year".to_string(),
            measure_attribute: "MigrationCount".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    pub fields: Vec<FieldSpec>,
    /// Columns normalized to uppercase after cleaning
    pub uppercase_fields: Vec<String>,
    /// Tokens that mean "no data"; matched exactly after trimming
    pub sentinels: Vec<String>,
    pub time_series: TimeSeriesConfig,
    pub export_path: PathBuf,
    pub bucket: String,
    pub object_key: String,
    pub table: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fields: vec![
                FieldSpec::new("firstname", "FirstName"),
                FieldSpec::new("lastname", "LastName"),
                FieldSpec::new("bloodgroup", "BloodGroup"),
            ],
            uppercase_fields: vec!["bloodgroup".to_string()],
            sentinels: ["", "nan", "NaN", "null", ".."]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            time_series: TimeSeriesConfig::default(),
            export_path: PathBuf::from("cleaned_personal_data.csv"),
            bucket: "indian-migration-data-bucket".to_string(),
            object_key: "cleaned_data/cleaned_personal_data.csv".to_string(),
            table: "MigrationRecords".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Load from a JSON file, or fall back to defaults when no path is given
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read pipeline config {}", path.display()))?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let config: PipelineConfig =
            serde_json::from_str(content).context("Failed to parse pipeline config")?;
        if config.fields.is_empty() {
            anyhow::bail!("Pipeline config must recognize at least one field");
        }
        Ok(config)
    }

    pub fn recognized_columns(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.column.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_migration_records() {
        let config = PipelineConfig::default();
        assert_eq!(
            config.recognized_columns(),
            vec!["firstname", "lastname", "bloodgroup"]
        );
        assert_eq!(config.table, "MigrationRecords");
        assert!(config.sentinels.contains(&"..".to_string()));
        assert!(config.sentinels.contains(&String::new()));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = PipelineConfig::from_json(r#"{"table": "Other", "bucket": "b"}"#).unwrap();
        assert_eq!(config.table, "Other");
        assert_eq!(config.bucket, "b");
        assert_eq!(config.fields.len(), 3);
        assert_eq!(config.time_series.measure_attribute, "MigrationCount");
    }

    #[test]
    fn test_custom_fields() {
        let json = r#"{"fields": [{"column": "city", "attribute": "City"}], "uppercase_fields": []}"#;
        let config = PipelineConfig::from_json(json).unwrap();
        assert_eq!(config.recognized_columns(), vec!["city"]);
        assert!(config.uppercase_fields.is_empty());
    }

    #[test]
    fn test_example_config_matches_defaults() {
        let json = include_str!("../../../config/pipeline.example.json");
        let config = PipelineConfig::from_json(json).unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn test_empty_fields_rejected() {
        assert!(PipelineConfig::from_json(r#"{"fields": []}"#).is_err());
    }

    #[test]
    fn test_invalid_json_rejected() {
        let err = PipelineConfig::from_json("{not json").unwrap_err();
        assert!(err.to_string().contains("Failed to parse pipeline config"));
    }

    #[tokio::test]
    async fn test_load_without_path_is_default() {
        let config = PipelineConfig::load(None).await.unwrap();
        assert_eq!(config, PipelineConfig::default());
    }
}
