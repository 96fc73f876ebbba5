//! Backup manager for the audit database
//!
//! Backups are single-file SQLite databases named
//! `audit_backup_YYYYMMDD_HHMMSS_mmm.db`.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};

use crate::audit::ChangeAuditLog;
use crate::error::{AuditError, AuditResult};

const PREFIX: &str = "audit_backup_";
const EXTENSION: &str = "db";

/// Metadata about a backup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupInfo {
    pub filename: String,
    pub path: PathBuf,
    /// Parsed from the filename
    pub created_at: DateTime<Local>,
    pub size_bytes: u64,
}

/// Manages backup creation and retention
pub struct BackupManager {
    backup_dir: PathBuf,
    /// Number of backups kept by `enforce_retention`
    retention: u32,
}

impl BackupManager {
    pub fn new(backup_dir: PathBuf, retention: u32) -> Self {
        Self {
            backup_dir,
            retention,
        }
    }

    /// Copy the audit log into a new backup file
    ///
    /// Returns the path to the created backup file.
    pub fn create_backup(&self, log: &ChangeAuditLog) -> AuditResult<PathBuf> {
        fs::create_dir_all(&self.backup_dir)
            .map_err(|e| AuditError::Io(format!("Failed to create backup directory: {}", e)))?;

        let now = Local::now();
        let filename = format!(
            "{}{}_{:03}.{}",
            PREFIX,
            now.format("%Y%m%d_%H%M%S"),
            now.timestamp_subsec_millis(),
            EXTENSION
        );
        let backup_path = self.backup_dir.join(filename);

        if backup_path.exists() {
            return Err(AuditError::Io(format!(
                "Backup already exists: {}",
                backup_path.display()
            )));
        }

        log.backup_to(&backup_path)?;
        tracing::info!(path = %backup_path.display(), "audit database backed up");

        Ok(backup_path)
    }

    /// List all available backups, newest first
    pub fn list_backups(&self) -> AuditResult<Vec<BackupInfo>> {
        if !self.backup_dir.exists() {
            return Ok(Vec::new());
        }

        let mut backups = Vec::new();

        for entry in fs::read_dir(&self.backup_dir)
            .map_err(|e| AuditError::Io(format!("Failed to read backup directory: {}", e)))?
        {
            let entry = entry
                .map_err(|e| AuditError::Io(format!("Failed to read directory entry: {}", e)))?;

            if let Some(info) = parse_backup_info(&entry.path()) {
                backups.push(info);
            }
        }

        backups.sort_by(|a, b| b.filename.cmp(&a.filename));
        Ok(backups)
    }

    /// Delete backups beyond the retention count, oldest first
    pub fn enforce_retention(&self) -> AuditResult<Vec<PathBuf>> {
        let mut deleted = Vec::new();

        for backup in self.list_backups()?.into_iter().skip(self.retention as usize) {
            fs::remove_file(&backup.path)
                .map_err(|e| AuditError::Io(format!("Failed to delete old backup: {}", e)))?;
            tracing::debug!(path = %backup.path.display(), "old backup removed");
            deleted.push(backup.path);
        }

        Ok(deleted)
    }

    /// Create a backup and then enforce the retention count
    pub fn create_backup_with_retention(
        &self,
        log: &ChangeAuditLog,
    ) -> AuditResult<(PathBuf, Vec<PathBuf>)> {
        let backup_path = self.create_backup(log)?;
        let deleted = self.enforce_retention()?;
        Ok((backup_path, deleted))
    }
}

fn parse_backup_info(path: &Path) -> Option<BackupInfo> {
    if path.extension()? != EXTENSION {
        return None;
    }

    let filename = path.file_name()?.to_str()?.to_string();
    let stamp = filename
        .strip_prefix(PREFIX)?
        .strip_suffix(&format!(".{}", EXTENSION))?;

    // YYYYMMDD_HHMMSS_mmm
    let (seconds, _millis) = stamp.rsplit_once('_')?;
    let naive = NaiveDateTime::parse_from_str(seconds, "%Y%m%d_%H%M%S").ok()?;
    let created_at = Local.from_local_datetime(&naive).earliest()?;

    let size_bytes = fs::metadata(path).ok()?.len();

    Some(BackupInfo {
        filename,
        path: path.to_path_buf(),
        created_at,
        size_bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{verify_schema, AuditAction};
    use tempfile::TempDir;

    fn file_backed_log(dir: &TempDir) -> ChangeAuditLog {
        let log = ChangeAuditLog::open(&dir.path().join("audit_tracker.db")).unwrap();
        log.log_action(AuditAction::Insert, "Invoices", "INV-1", None, None, None, None);
        log
    }

    #[test]
    fn test_create_backup() {
        let temp_dir = TempDir::new().unwrap();
        let log = file_backed_log(&temp_dir);
        let manager = BackupManager::new(temp_dir.path().join("backups"), 10);

        let path = manager.create_backup(&log).unwrap();

        assert!(path.exists());
        let report = verify_schema(&path).unwrap();
        assert_eq!(report.entry_count, 1);
    }

    #[test]
    fn test_list_backups() {
        let temp_dir = TempDir::new().unwrap();
        let backup_dir = temp_dir.path().join("backups");
        fs::create_dir_all(&backup_dir).unwrap();

        for name in [
            "audit_backup_20250101_120000_000.db",
            "audit_backup_20250103_120000_000.db",
            "audit_backup_20250102_120000_000.db",
            "notes.txt",
            "audit_tracker.db",
        ] {
            fs::write(backup_dir.join(name), b"x").unwrap();
        }

        let manager = BackupManager::new(backup_dir, 10);
        let backups = manager.list_backups().unwrap();

        assert_eq!(backups.len(), 3);
        assert_eq!(backups[0].filename, "audit_backup_20250103_120000_000.db");
        assert_eq!(backups[2].filename, "audit_backup_20250101_120000_000.db");
    }

    #[test]
    fn test_retention() {
        let temp_dir = TempDir::new().unwrap();
        let backup_dir = temp_dir.path().join("backups");
        fs::create_dir_all(&backup_dir).unwrap();

        for day in 1..=5 {
            let name = format!("audit_backup_202501{:02}_120000_000.db", day);
            fs::write(backup_dir.join(name), b"x").unwrap();
        }

        let manager = BackupManager::new(backup_dir, 2);
        let deleted = manager.enforce_retention().unwrap();

        assert_eq!(deleted.len(), 3);
        let remaining = manager.list_backups().unwrap();
        assert_eq!(remaining.len(), 2);
        assert_eq!(remaining[1].filename, "audit_backup_20250104_120000_000.db");
    }

    #[test]
    fn test_missing_dir_lists_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let manager = BackupManager::new(temp_dir.path().join("nope"), 3);
        assert!(manager.list_backups().unwrap().is_empty());
    }
}
