//! Export module for the audit log
//!
//! Provides audit log export in multiple formats:
//! - JSON: machine-readable, with schema version and the filters used
//! - YAML: human-readable, same document as JSON
//! - CSV: one row per entry for spreadsheets, JSON columns serialized inline

pub mod csv;
pub mod json;
pub mod yaml;

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;

use crate::error::AuditError;

pub use self::csv::export_entries_csv;
pub use json::{export_json, AuditExport, EXPORT_SCHEMA_VERSION};
pub use yaml::export_yaml;

/// Supported export formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ExportFormat {
    /// JSON document with metadata
    #[default]
    Json,
    /// YAML document, same content as JSON
    #[value(alias = "yml")]
    Yaml,
    /// One row per entry
    Csv,
}

impl ExportFormat {
    /// Infer the format from a file extension
    pub fn from_extension(path: &std::path::Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        ext.parse().ok()
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Yaml => write!(f, "yaml"),
            Self::Csv => write!(f, "csv"),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            "csv" => Ok(Self::Csv),
            other => Err(AuditError::Export(format!(
                "Unknown export format '{}'. Use json, yaml or csv",
                other
            ))),
        }
    }
}
