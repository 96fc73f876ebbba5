//! Settings for the audit tooling
//!
//! Stored as `config.json` next to the audit database. Every field has a
//! default, so a partial or missing file is fine.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::paths::AuditPaths;
use crate::audit::{EXPORT_LIMIT, RECENT_WINDOW_HOURS, RECORD_HISTORY_LIMIT};
use crate::error::AuditError;

/// Longest accepted recent-activity window: ten years
pub const MAX_RECENT_WINDOW_HOURS: i64 = 24 * 366 * 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Entries per page in `logs`
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,

    #[serde(default = "default_record_history_limit")]
    pub record_history_limit: u32,

    #[serde(default = "default_export_limit")]
    pub export_limit: u32,

    /// Trailing window for the recent-activity statistic
    #[serde(default = "default_recent_window_hours")]
    pub recent_window_hours: i64,

    /// Audit database backups kept in `backups/`
    #[serde(default = "default_backup_retention")]
    pub backup_retention: u32,

    /// Business database used to capture snapshots in `log --capture`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_database: Option<PathBuf>,

    /// Primary key column per business table; tables not listed use `rowid`
    #[serde(default = "default_primary_keys")]
    pub primary_keys: HashMap<String, String>,
}

fn default_schema_version() -> u32 {
    1
}

fn default_page_size() -> u32 {
    50
}

fn default_record_history_limit() -> u32 {
    RECORD_HISTORY_LIMIT
}

fn default_export_limit() -> u32 {
    EXPORT_LIMIT
}

fn default_recent_window_hours() -> i64 {
    RECENT_WINDOW_HOURS
}

fn default_backup_retention() -> u32 {
    10
}

fn default_primary_keys() -> HashMap<String, String> {
    [
        ("Invoices", "InvoiceID"),
        ("DebtRegister", "DebtName"),
        ("KwartaalData", "kenmerk"),
    ]
    .into_iter()
    .map(|(table, pk)| (table.to_string(), pk.to_string()))
    .collect()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            default_page_size: default_page_size(),
            record_history_limit: default_record_history_limit(),
            export_limit: default_export_limit(),
            recent_window_hours: default_recent_window_hours(),
            backup_retention: default_backup_retention(),
            business_database: None,
            primary_keys: default_primary_keys(),
        }
    }
}

impl Settings {
    /// Load settings from disk, or defaults if the file doesn't exist
    pub fn load_or_create(paths: &AuditPaths) -> Result<Self, AuditError> {
        let settings_path = paths.settings_file();

        if !settings_path.exists() {
            return Ok(Settings::default());
        }

        let contents = std::fs::read_to_string(&settings_path)
            .map_err(|e| AuditError::Io(format!("Failed to read settings file: {}", e)))?;

        let settings: Settings = serde_json::from_str(&contents)
            .map_err(|e| AuditError::Config(format!("Failed to parse settings file: {}", e)))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Save settings to disk
    pub fn save(&self, paths: &AuditPaths) -> Result<(), AuditError> {
        paths.ensure_directories()?;

        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| AuditError::Config(format!("Failed to serialize settings: {}", e)))?;

        std::fs::write(paths.settings_file(), contents)
            .map_err(|e| AuditError::Io(format!("Failed to write settings file: {}", e)))?;

        tracing::debug!(path = %paths.settings_file().display(), "settings saved");
        Ok(())
    }

    fn validate(&self) -> Result<(), AuditError> {
        if self.default_page_size == 0 {
            return Err(AuditError::Config(
                "default_page_size must be at least 1".into(),
            ));
        }
        if !(1..=MAX_RECENT_WINDOW_HOURS).contains(&self.recent_window_hours) {
            return Err(AuditError::Config(format!(
                "recent_window_hours must be between 1 and {}",
                MAX_RECENT_WINDOW_HOURS
            )));
        }
        Ok(())
    }
}
