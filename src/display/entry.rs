//! Audit entry display formatting

use tabled::settings::Style;
use tabled::{Table, Tabled};

use super::truncate;
use crate::audit::{format_value, summarize_changes, AuditEntry, SchemaReport, Snapshot};

#[derive(Tabled)]
struct EntryRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Timestamp")]
    timestamp: String,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Table")]
    table: String,
    #[tabled(rename = "Record")]
    record: String,
    #[tabled(rename = "Changes")]
    changes: String,
}

impl From<&AuditEntry> for EntryRow {
    fn from(entry: &AuditEntry) -> Self {
        let changes = match &entry.changes {
            Some(changes) if changes.is_empty() => "(no changes)".to_string(),
            Some(changes) => summarize_changes(changes).unwrap_or_default(),
            None => String::new(),
        };

        Self {
            id: entry.id,
            // Drop microseconds in the list view
            timestamp: entry.timestamp.chars().take(19).collect(),
            action: entry.action.to_string(),
            table: entry.table_name.clone(),
            record: truncate(&entry.record_id, 24),
            changes: truncate(&changes, 60),
        }
    }
}

/// Format a list of entries as a table
pub fn format_entry_table(entries: &[AuditEntry]) -> String {
    if entries.is_empty() {
        return "No audit entries found.\n".to_string();
    }

    let rows: Vec<EntryRow> = entries.iter().map(EntryRow::from).collect();
    let mut table = Table::new(rows);
    table.with(Style::modern());
    format!("{}\n", table)
}

/// Pagination summary shown under a page of entries
pub fn format_page_footer(page: u32, per_page: u32, total: u64) -> String {
    let per_page = u64::from(per_page.max(1));
    let pages = total.div_ceil(per_page).max(1);
    format!("Page {} of {} ({} entries)\n", page.max(1), pages, total)
}

/// Format one entry with all its fields
pub fn format_entry_details(entry: &AuditEntry) -> String {
    let mut output = String::new();

    output.push_str(&format!("Entry:       #{}\n", entry.id));
    output.push_str(&format!("Timestamp:   {}\n", entry.timestamp));
    output.push_str(&format!("Action:      {}\n", entry.action));
    output.push_str(&format!("Table:       {}\n", entry.table_name));
    output.push_str(&format!("Record:      {}\n", entry.record_id));

    if let Some(created_at) = &entry.created_at {
        output.push_str(&format!("Created at:  {} (UTC)\n", created_at));
    }
    if let Some(ip) = &entry.ip_address {
        output.push_str(&format!("IP address:  {}\n", ip));
    }
    if let Some(agent) = &entry.user_agent {
        output.push_str(&format!("User agent:  {}\n", agent));
    }
    if let Some(session) = &entry.session_id {
        output.push_str(&format!("Session:     {}\n", session));
    }
    if let Some(info) = &entry.user_info {
        output.push_str(&format!("User info:   {}\n", info));
    }

    if let Some(changes) = &entry.changes {
        output.push_str("\nChanges:\n");
        if changes.is_empty() {
            output.push_str("  (none)\n");
        }
        for (field, change) in changes {
            output.push_str(&format!(
                "  {}: {} -> {}\n",
                field,
                format_value(&change.old),
                format_value(&change.new)
            ));
        }
    }

    if let Some(old) = &entry.old_values {
        output.push_str("\nOld values:\n");
        output.push_str(&format_snapshot(old));
    }
    if let Some(new) = &entry.new_values {
        output.push_str("\nNew values:\n");
        output.push_str(&format_snapshot(new));
    }

    output
}

fn format_snapshot(snapshot: &Snapshot) -> String {
    let width = snapshot.keys().map(|k| k.chars().count()).max().unwrap_or(0);
    snapshot
        .iter()
        .map(|(key, value)| format!("  {:width$}  {}\n", key, format_value(value), width = width))
        .collect()
}

/// Format the result of a schema verification
pub fn format_schema_report(report: &SchemaReport) -> String {
    let mut output = String::new();

    if !report.table_present {
        output.push_str("✗ audit_log table is missing\n");
        return output;
    }

    output.push_str("✓ audit_log table present\n");
    if report.missing_columns.is_empty() {
        output.push_str("✓ all required columns present\n");
    } else {
        output.push_str(&format!(
            "✗ missing columns: {}\n",
            report.missing_columns.join(", ")
        ));
    }

    for index in &report.present_indexes {
        output.push_str(&format!("✓ index {}\n", index));
    }
    for index in &report.missing_indexes {
        output.push_str(&format!("✗ index {} missing\n", index));
    }

    output.push_str(&format!("Entries: {}\n", report.entry_count));
    output
}
