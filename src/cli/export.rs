//! CLI command for exporting the audit log

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use clap::Args;

use super::logs::FilterArgs;
use crate::audit::ChangeAuditLog;
use crate::config::settings::Settings;
use crate::error::{AuditError, AuditResult};
use crate::export::{export_entries_csv, export_json, export_yaml, AuditExport, ExportFormat};

/// Arguments for `export`
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Output file path
    pub output: PathBuf,

    /// Export format (default: from the file extension, else json)
    #[arg(short, long, value_enum)]
    pub format: Option<ExportFormat>,

    /// Maximum number of entries (default from settings)
    #[arg(short, long)]
    pub limit: Option<u32>,

    /// Write JSON without indentation
    #[arg(long)]
    pub compact: bool,

    #[command(flatten)]
    pub filters: FilterArgs,
}

/// Handle `export`
pub fn handle_export_command(
    log: &ChangeAuditLog,
    settings: &Settings,
    args: ExportArgs,
) -> AuditResult<()> {
    let format = args
        .format
        .or_else(|| ExportFormat::from_extension(&args.output))
        .unwrap_or_default();
    let limit = args.limit.unwrap_or(settings.export_limit);

    let query = args.filters.to_query()?;
    let export = AuditExport::from_log(log, &query, limit)?;

    let file = File::create(&args.output).map_err(|e| {
        AuditError::Export(format!(
            "Failed to create file {}: {}",
            args.output.display(),
            e
        ))
    })?;
    let mut writer = BufWriter::new(file);

    match format {
        ExportFormat::Json => export_json(&export, &mut writer, !args.compact)?,
        ExportFormat::Yaml => export_yaml(&export, &mut writer)?,
        ExportFormat::Csv => export_entries_csv(&export.entries, &mut writer)?,
    }
    writer.flush()?;

    println!(
        "Exported {} entries ({}) to: {}",
        export.entries.len(),
        format,
        args.output.display()
    );
    if export.is_truncated() {
        println!(
            "Note: {} entries matched; raise --limit to export all of them.",
            export.total_matching
        );
    }

    Ok(())
}
