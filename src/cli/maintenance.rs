//! Administrative CLI commands
//!
//! `init`, `verify`, `reset` and the manual `log` entry used by scripts.

use std::path::Path;

use clap::Args;
use serde_json::Value;

use crate::audit::{
    verify_schema, AuditAction, ChangeAuditLog, RecordStore, RequestContext, Snapshot,
    SqliteRecordStore,
};
use crate::backup::BackupManager;
use crate::config::paths::AuditPaths;
use crate::config::settings::Settings;
use crate::display::{format_schema_report, format_statistics};
use crate::error::{AuditError, AuditResult};

/// Handle `init`: create the schema and write default settings
pub fn handle_init_command(
    paths: &AuditPaths,
    settings: &Settings,
    db_path: &Path,
) -> AuditResult<()> {
    println!("Initializing audit database at: {}", db_path.display());

    paths.ensure_directories()?;
    ChangeAuditLog::open(db_path)?;
    if !paths.settings_file().exists() {
        settings.save(paths)?;
    }

    let report = verify_schema(db_path)?;
    print!("{}", format_schema_report(&report));
    println!("Initialization complete!");
    Ok(())
}

/// Handle `verify`: check the schema without modifying anything
pub fn handle_verify_command(db_path: &Path) -> AuditResult<()> {
    let report = verify_schema(db_path)?;
    print!("{}", format_schema_report(&report));

    if report.is_valid() {
        println!("Audit database is valid.");
        Ok(())
    } else {
        Err(AuditError::Storage(format!(
            "Audit database at {} is incomplete; run `ozark-audit init`",
            db_path.display()
        )))
    }
}

/// Handle `reset`: delete every entry, optionally after a backup
pub fn handle_reset_command(
    log: &ChangeAuditLog,
    paths: &AuditPaths,
    settings: &Settings,
    backup: bool,
    force: bool,
) -> AuditResult<()> {
    let stats = log.get_statistics()?;
    print!("{}", format_statistics(&stats, settings.recent_window_hours));
    println!();

    if stats.overall.total_actions == 0 {
        println!("Audit log is already empty.");
        return Ok(());
    }

    if !force {
        println!(
            "WARNING: This will permanently delete all {} audit entries!",
            stats.overall.total_actions
        );
        println!("To proceed, run again with --force flag:");
        println!("  ozark-audit reset --force{}", if backup { " --backup" } else { "" });
        return Ok(());
    }

    if backup {
        let manager = BackupManager::new(paths.backup_dir(), settings.backup_retention);
        let backup_path = manager.create_backup(log)?;
        println!("Backup saved: {}", backup_path.display());
    }

    let removed = log.purge()?;
    println!("Deleted {} audit entries.", removed);
    Ok(())
}

/// Arguments for the manual `log` entry
#[derive(Args, Debug)]
pub struct LogEntryArgs {
    /// INSERT, UPDATE, DELETE or a system label
    pub action: String,

    /// Business table (or SYSTEM)
    pub table: String,

    /// Record identifier
    pub record_id: String,

    /// Old values as a JSON object
    #[arg(long)]
    pub old: Option<String>,

    /// New values as a JSON object
    #[arg(long)]
    pub new: Option<String>,

    /// User info as JSON
    #[arg(long)]
    pub user: Option<String>,

    /// Read the current record from the business database: as new values
    /// for INSERT/UPDATE, as old values for DELETE
    #[arg(long)]
    pub capture: bool,

    #[arg(long)]
    pub ip: Option<String>,

    #[arg(long)]
    pub user_agent: Option<String>,

    #[arg(long)]
    pub session: Option<String>,
}

impl LogEntryArgs {
    fn request_context(&self) -> Option<RequestContext> {
        if self.ip.is_none() && self.user_agent.is_none() && self.session.is_none() {
            return None;
        }

        let mut ctx = RequestContext::new();
        if let Some(ip) = &self.ip {
            ctx = ctx.with_ip_address(ip.as_str());
        }
        if let Some(agent) = &self.user_agent {
            ctx = ctx.with_user_agent(agent.as_str());
        }
        if let Some(session) = &self.session {
            ctx = ctx.with_session_id(session.as_str());
        }
        Some(ctx)
    }
}

fn parse_snapshot(label: &str, text: Option<&str>) -> AuditResult<Option<Snapshot>> {
    text.map(|t| {
        let value: Value = serde_json::from_str(t)
            .map_err(|e| AuditError::Snapshot(format!("--{} is not valid JSON: {}", label, e)))?;
        Snapshot::from_value(value)
    })
    .transpose()
}

/// Handle `log`: write one entry and print its id
pub fn handle_log_entry_command(
    log: &ChangeAuditLog,
    settings: &Settings,
    args: LogEntryArgs,
) -> AuditResult<()> {
    let action: AuditAction = args.action.parse()?;
    let mut old_values = parse_snapshot("old", args.old.as_deref())?;
    let mut new_values = parse_snapshot("new", args.new.as_deref())?;
    let user_info = args
        .user
        .as_deref()
        .map(serde_json::from_str::<Value>)
        .transpose()?;

    if args.capture {
        let db = settings.business_database.as_deref().ok_or_else(|| {
            AuditError::Config("--capture needs business_database in config.json".into())
        })?;
        let records = SqliteRecordStore::open(db, settings.primary_keys.clone())?;
        let snapshot = records
            .fetch_snapshot(&args.table, &args.record_id)?
            .ok_or_else(|| AuditError::record_not_found(&args.table, &args.record_id))?;

        match action {
            AuditAction::Delete => old_values = Some(snapshot),
            _ => new_values = Some(snapshot),
        }
    }

    let ctx = args.request_context();
    let id = log
        .log_action(
            action,
            &args.table,
            &args.record_id,
            old_values,
            new_values,
            user_info,
            ctx.as_ref(),
        )
        .ok_or_else(|| AuditError::Storage("audit entry was not written".into()))?;

    println!("Logged entry #{}", id);
    if let Some(changes) = log.get_entry(id)?.changes {
        println!("Changed fields: {}", changes.len());
    }
    Ok(())
}
