use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use ozark_audit::audit::ChangeAuditLog;
use ozark_audit::cli::{
    handle_backup_command, handle_export_command, handle_history_command, handle_init_command,
    handle_log_entry_command, handle_logs_command, handle_reset_command, handle_show_command,
    handle_stats_command, handle_verify_command, BackupCommands, ExportArgs, LogEntryArgs,
    LogsArgs,
};
use ozark_audit::config::{paths::AuditPaths, settings::Settings};

/// Environment variable holding the tracing filter
const LOG_ENV: &str = "OZARK_AUDIT_LOG";

#[derive(Parser)]
#[command(
    name = "ozark-audit",
    version,
    about = "Change audit log for the Ozark bookkeeping database",
    long_about = "Inspect, export and maintain the append-only audit log that records \
                  every insert, update and delete on the Ozark bookkeeping tables."
)]
struct Cli {
    /// Audit database path (default: audit_tracker.db in the data directory)
    #[arg(long, global = true, env = "OZARK_AUDIT_DB")]
    db: Option<PathBuf>,

    /// Verbose diagnostics on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the audit database and default settings
    Init,

    /// Check the audit database schema
    Verify,

    /// Show current configuration and paths
    Config,

    /// List audit entries, newest first
    #[command(alias = "ls")]
    Logs(LogsArgs),

    /// Show the change history of one record
    History {
        /// Business table
        table: String,
        /// Record identifier
        record_id: String,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one entry in full
    Show {
        /// Entry id
        id: i64,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Audit log statistics
    Stats {
        /// Also show a per-day summary for the last N days
        #[arg(long)]
        daily: Option<u32>,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Export entries to JSON, YAML or CSV
    Export(ExportArgs),

    /// Audit database backups
    #[command(subcommand)]
    Backup(BackupCommands),

    /// Delete every audit entry
    Reset {
        /// Back up the database first
        #[arg(long)]
        backup: bool,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Record an entry by hand (for scripts and batch jobs)
    Log(LogEntryArgs),
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(fallback));

    // A subscriber may already be installed when embedded
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let paths = AuditPaths::new()?;
    let settings = Settings::load_or_create(&paths)?;
    let db_path = cli.db.clone().unwrap_or_else(|| paths.audit_db());
    tracing::debug!(db = %db_path.display(), "using audit database");

    let Some(command) = cli.command else {
        println!("ozark-audit - change audit log for the Ozark bookkeeping database");
        println!();
        println!("Run 'ozark-audit --help' for usage information.");
        return Ok(());
    };

    match command {
        Commands::Init => handle_init_command(&paths, &settings, &db_path)?,
        Commands::Verify => handle_verify_command(&db_path)?,
        Commands::Config => {
            println!("Ozark Audit Configuration");
            println!("=========================");
            println!("Data directory:   {}", paths.base_dir().display());
            println!("Audit database:   {}", db_path.display());
            println!("Settings file:    {}", paths.settings_file().display());
            println!("Backup directory: {}", paths.backup_dir().display());
            println!();
            println!("Settings:");
            println!("  Page size:            {}", settings.default_page_size);
            println!("  Record history limit: {}", settings.record_history_limit);
            println!("  Export limit:         {}", settings.export_limit);
            println!("  Recent window:        {}h", settings.recent_window_hours);
            println!("  Backups kept:         {}", settings.backup_retention);
            match &settings.business_database {
                Some(db) => println!("  Business database:    {}", db.display()),
                None => println!("  Business database:    (not set)"),
            }
        }
        command => {
            let log = ChangeAuditLog::open(&db_path)?.with_recent_window(settings.recent_window_hours);

            match command {
                Commands::Logs(args) => handle_logs_command(&log, &settings, args)?,
                Commands::History {
                    table,
                    record_id,
                    json,
                } => handle_history_command(&log, &settings, &table, &record_id, json)?,
                Commands::Show { id, json } => handle_show_command(&log, id, json)?,
                Commands::Stats { daily, json } => {
                    handle_stats_command(&log, &settings, daily, json)?
                }
                Commands::Export(args) => handle_export_command(&log, &settings, args)?,
                Commands::Backup(cmd) => handle_backup_command(&log, &paths, &settings, cmd)?,
                Commands::Reset { backup, force } => {
                    handle_reset_command(&log, &paths, &settings, backup, force)?
                }
                Commands::Log(args) => handle_log_entry_command(&log, &settings, args)?,
                Commands::Init | Commands::Verify | Commands::Config => {}
            }
        }
    }

    Ok(())
}
