//! JSON Export functionality
//!
//! Exports audit entries with schema versioning and the filters that
//! selected them.

use std::io::Write;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::audit::{AuditEntry, AuditQuery, ChangeAuditLog};
use crate::error::{AuditError, AuditResult};

/// Current export schema version
pub const EXPORT_SCHEMA_VERSION: &str = "1.0.0";

/// Audit log export document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditExport {
    /// Schema version for compatibility checking
    pub schema_version: String,

    pub exported_at: DateTime<Utc>,

    /// Application version that created the export
    pub app_version: String,

    /// Filters used to select the entries
    pub filters: AuditQuery,

    /// Entries matching the filters, before the export cap
    pub total_matching: u64,

    /// Exported entries, newest first
    pub entries: Vec<AuditEntry>,
}

impl AuditExport {
    /// Collect up to `limit` entries matching `query`, starting from the newest
    pub fn from_log(log: &ChangeAuditLog, query: &AuditQuery, limit: u32) -> AuditResult<Self> {
        let query = query.clone().offset(0).limit(limit);
        let total_matching = log.count_audit_logs(&query)?;
        let entries = log.get_audit_logs(&query)?;

        if total_matching > entries.len() as u64 {
            tracing::warn!(
                total_matching,
                exported = entries.len(),
                "export truncated at the export limit"
            );
        }

        Ok(Self {
            schema_version: EXPORT_SCHEMA_VERSION.to_string(),
            exported_at: Utc::now(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            filters: query,
            total_matching,
            entries,
        })
    }

    /// Whether the export cap cut off matching entries
    pub fn is_truncated(&self) -> bool {
        self.total_matching > self.entries.len() as u64
    }
}

/// Write an export as JSON
pub fn export_json<W: Write>(export: &AuditExport, writer: &mut W, pretty: bool) -> AuditResult<()> {
    if pretty {
        serde_json::to_writer_pretty(writer, export)
    } else {
        serde_json::to_writer(writer, export)
    }
    .map_err(|e| AuditError::Export(e.to_string()))
}
