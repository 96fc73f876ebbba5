//! Backup CLI commands

use clap::Subcommand;

use crate::audit::ChangeAuditLog;
use crate::backup::BackupManager;
use crate::config::paths::AuditPaths;
use crate::config::settings::Settings;
use crate::error::AuditResult;

/// Backup subcommands
#[derive(Subcommand, Debug)]
pub enum BackupCommands {
    /// Back up the audit database
    Create,

    /// List all available backups
    List {
        /// Show detailed information
        #[arg(short, long)]
        verbose: bool,
    },

    /// Delete backups beyond the retention count
    Prune {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

/// Handle a backup command
pub fn handle_backup_command(
    log: &ChangeAuditLog,
    paths: &AuditPaths,
    settings: &Settings,
    cmd: BackupCommands,
) -> AuditResult<()> {
    let manager = BackupManager::new(paths.backup_dir(), settings.backup_retention);

    match cmd {
        BackupCommands::Create => {
            println!("Creating backup...");
            let (backup_path, deleted) = manager.create_backup_with_retention(log)?;
            println!("Backup created: {}", backup_path.display());
            if !deleted.is_empty() {
                println!("Removed {} old backup(s).", deleted.len());
            }
        }

        BackupCommands::List { verbose } => {
            let backups = manager.list_backups()?;

            if backups.is_empty() {
                println!("No backups found.");
                println!("Create one with: ozark-audit backup create");
                return Ok(());
            }

            println!("Available Backups");
            println!("=================");
            println!();

            for (i, backup) in backups.iter().enumerate() {
                let age = chrono::Local::now().signed_duration_since(backup.created_at);

                if verbose {
                    println!(
                        "{}. {}\n   Created: {}\n   Size: {}\n   Path: {}\n",
                        i + 1,
                        backup.filename,
                        backup.created_at.format("%Y-%m-%d %H:%M:%S"),
                        format_size(backup.size_bytes),
                        backup.path.display(),
                    );
                } else {
                    println!(
                        "  {}. {} ({} ago, {})",
                        i + 1,
                        backup.filename,
                        format_duration(age),
                        format_size(backup.size_bytes),
                    );
                }
            }

            println!();
            println!("Total: {} backup(s)", backups.len());
        }

        BackupCommands::Prune { force } => {
            let backups = manager.list_backups()?;
            let to_delete = backups
                .len()
                .saturating_sub(settings.backup_retention as usize);

            if to_delete == 0 {
                println!("No backups to prune.");
                println!(
                    "Keeping up to {} backup(s); you have {}.",
                    settings.backup_retention,
                    backups.len()
                );
                return Ok(());
            }

            if !force {
                println!(
                    "{} of {} backup(s) would be deleted.",
                    to_delete,
                    backups.len()
                );
                println!("To delete them, run again with --force flag:");
                println!("  ozark-audit backup prune --force");
                return Ok(());
            }

            let deleted = manager.enforce_retention()?;
            println!("Deleted {} backup(s).", deleted.len());
        }
    }

    Ok(())
}

/// Format a duration in human-readable form
fn format_duration(duration: chrono::Duration) -> String {
    let total_seconds = duration.num_seconds().max(0);

    if total_seconds < 60 {
        return format!("{}s", total_seconds);
    }

    let minutes = total_seconds / 60;
    if minutes < 60 {
        return format!("{}m", minutes);
    }

    let hours = minutes / 60;
    if hours < 24 {
        return format!("{}h", hours);
    }

    format!("{}d", hours / 24)
}

/// Format a file size in human-readable form
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(chrono::Duration::seconds(42)), "42s");
        assert_eq!(format_duration(chrono::Duration::minutes(5)), "5m");
        assert_eq!(format_duration(chrono::Duration::hours(3)), "3h");
        assert_eq!(format_duration(chrono::Duration::days(2)), "2d");
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
    }
}
