//! CSV Export functionality
//!
//! One row per entry. JSON-valued columns are written as compact JSON text.

use std::io::Write;

use serde::Serialize;

use crate::audit::AuditEntry;
use crate::error::AuditResult;

#[derive(Serialize)]
struct EntryRow<'a> {
    id: i64,
    timestamp: &'a str,
    action: &'a str,
    table_name: &'a str,
    record_id: &'a str,
    user_info: String,
    changes: String,
    old_values: String,
    new_values: String,
    ip_address: &'a str,
    user_agent: &'a str,
    session_id: &'a str,
    created_at: &'a str,
}

fn json_cell<T: Serialize>(value: Option<&T>) -> AuditResult<String> {
    match value {
        Some(v) => Ok(serde_json::to_string(v)?),
        None => Ok(String::new()),
    }
}

/// Export entries to CSV with a header row
pub fn export_entries_csv<W: Write>(entries: &[AuditEntry], writer: W) -> AuditResult<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    for entry in entries {
        csv_writer.serialize(EntryRow {
            id: entry.id,
            timestamp: &entry.timestamp,
            action: entry.action.as_str(),
            table_name: &entry.table_name,
            record_id: &entry.record_id,
            user_info: json_cell(entry.user_info.as_ref())?,
            changes: json_cell(entry.changes.as_ref())?,
            old_values: json_cell(entry.old_values.as_ref())?,
            new_values: json_cell(entry.new_values.as_ref())?,
            ip_address: entry.ip_address.as_deref().unwrap_or(""),
            user_agent: entry.user_agent.as_deref().unwrap_or(""),
            session_id: entry.session_id.as_deref().unwrap_or(""),
            created_at: entry.created_at.as_deref().unwrap_or(""),
        })?;
    }

    csv_writer.flush()?;
    Ok(())
}
