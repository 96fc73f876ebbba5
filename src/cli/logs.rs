//! CLI commands for reading the audit log
//!
//! `logs`, `history` and `show`.

use clap::Args;

use crate::audit::{AuditQuery, ChangeAuditLog};
use crate::config::settings::Settings;
use crate::display::{format_entry_details, format_entry_table, format_page_footer};
use crate::error::AuditResult;

/// Filters shared by `logs` and `export`
#[derive(Args, Debug, Default, Clone)]
pub struct FilterArgs {
    /// Only entries for this table
    #[arg(short, long)]
    pub table: Option<String>,

    /// Only this action (INSERT, UPDATE, DELETE or a system label)
    #[arg(short, long)]
    pub action: Option<String>,

    /// Only entries for this record id
    #[arg(short, long)]
    pub record: Option<String>,

    /// Earliest timestamp (YYYY-MM-DD or YYYY-MM-DD HH:MM:SS)
    #[arg(long)]
    pub from: Option<String>,

    /// Latest timestamp; a bare date includes the whole day
    #[arg(long)]
    pub to: Option<String>,

    /// Case-insensitive text search across the entry
    #[arg(short, long)]
    pub search: Option<String>,
}

impl FilterArgs {
    /// Build a query from the filters, rejecting malformed values up front
    pub fn to_query(&self) -> AuditResult<AuditQuery> {
        let mut query = AuditQuery::new();

        if let Some(table) = &self.table {
            query = query.table(table.as_str());
        }
        if let Some(action) = &self.action {
            query = query.action(action.parse()?);
        }
        if let Some(record) = &self.record {
            query = query.record(record);
        }
        if let Some(from) = &self.from {
            query = query.date_from(from.as_str());
        }
        if let Some(to) = &self.to {
            query = query.date_to(to.as_str());
        }
        if let Some(search) = &self.search {
            query = query.search(search.as_str());
        }

        query.timestamp_bounds()?;
        Ok(query)
    }
}

/// Arguments for `logs`
#[derive(Args, Debug)]
pub struct LogsArgs {
    #[command(flatten)]
    pub filters: FilterArgs,

    /// Page number, starting at 1
    #[arg(short, long, default_value = "1")]
    pub page: u32,

    /// Entries per page (default from settings)
    #[arg(long)]
    pub per_page: Option<u32>,

    /// Print the page as JSON
    #[arg(long)]
    pub json: bool,
}

/// Handle `logs`
pub fn handle_logs_command(
    log: &ChangeAuditLog,
    settings: &Settings,
    args: LogsArgs,
) -> AuditResult<()> {
    let per_page = args.per_page.unwrap_or(settings.default_page_size).max(1);
    let page = args.page.max(1);
    let query = args.filters.to_query()?.page(page, per_page);

    let entries = log.get_audit_logs(&query)?;
    let total = log.count_audit_logs(&query)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    print!("{}", format_entry_table(&entries));
    print!("{}", format_page_footer(page, per_page, total));
    Ok(())
}

/// Handle `history <table> <record_id>`
pub fn handle_history_command(
    log: &ChangeAuditLog,
    settings: &Settings,
    table: &str,
    record_id: &str,
    json: bool,
) -> AuditResult<()> {
    let query = AuditQuery::record_history(table, record_id).limit(settings.record_history_limit);
    let entries = log.get_audit_logs(&query)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    println!("History of {} {}", table, record_id);
    println!();
    if entries.is_empty() {
        println!("No audit entries found.");
        return Ok(());
    }
    for entry in &entries {
        println!("{}", entry.format_human_readable());
    }
    println!();
    println!("{} change(s)", entries.len());
    Ok(())
}

/// Handle `show <id>`
pub fn handle_show_command(log: &ChangeAuditLog, id: i64, json: bool) -> AuditResult<()> {
    let entry = log.get_entry(id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entry)?);
    } else {
        print!("{}", format_entry_details(&entry));
    }
    Ok(())
}
