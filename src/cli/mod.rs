//! CLI command handlers
//!
//! Bridges the clap argument parsing with the audit log component.

pub mod backup;
pub mod export;
pub mod logs;
pub mod maintenance;
pub mod stats;

pub use backup::{handle_backup_command, BackupCommands};
pub use export::{handle_export_command, ExportArgs};
pub use logs::{
    handle_history_command, handle_logs_command, handle_show_command, FilterArgs, LogsArgs,
};
pub use maintenance::{
    handle_init_command, handle_log_entry_command, handle_reset_command, handle_verify_command,
    LogEntryArgs,
};
pub use stats::handle_stats_command;
