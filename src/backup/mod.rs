//! Backups of the audit database
//!
//! `BackupManager` writes consistent copies of the audit database into the
//! backup directory using SQLite's online backup, lists them, and prunes
//! the oldest beyond the retention count.
//!
//! # Example
//!
//! ```rust,ignore
//! use ozark_audit::backup::BackupManager;
//!
//! let manager = BackupManager::new(paths.backup_dir(), settings.backup_retention);
//! let path = manager.create_backup(&log)?;
//! manager.enforce_retention()?;
//! ```

mod manager;

pub use manager::{BackupInfo, BackupManager};
